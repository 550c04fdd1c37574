//! Builds the generated item pool and scatters it one item per room.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use crate::config::ItemsConfig;
use crate::world::content;
use crate::world::types::{Item, ItemCategory, Room};

pub struct ItemGenerator<'a> {
    config: &'a ItemsConfig,
}

impl<'a> ItemGenerator<'a> {
    pub fn new(config: &'a ItemsConfig) -> Self {
        Self { config }
    }

    /// Pool size for a world; never more than one item per room.
    pub fn pool_size(&self, room_count: usize) -> usize {
        if self.config.items_per_room_ratio <= 0.0 {
            return 0;
        }
        let size = (room_count as f64 / self.config.items_per_room_ratio).floor() as usize;
        size.min(room_count)
    }

    /// Items split evenly across categories, remainder to the earliest ones.
    /// Templates repeat once a category runs out of them.
    pub fn build_pool(&self, room_count: usize) -> Vec<Item> {
        let total = self.pool_size(room_count);
        let categories = ItemCategory::GENERATED;
        let base = total / categories.len();
        let remainder = total % categories.len();

        let mut pool = Vec::with_capacity(total);
        for (index, category) in categories.iter().copied().enumerate() {
            let count = base + usize::from(index < remainder);
            let templates = content::item_templates(category);
            if templates.is_empty() {
                continue;
            }
            for n in 0..count {
                let (name, description) = templates[n % templates.len()];
                pool.push(Item::new(
                    &format!("{}_{}", category.as_str(), n + 1),
                    name,
                    description,
                    category,
                ));
            }
        }
        pool
    }

    /// Place the pool into a random subset of distinct rooms. Returns the number placed.
    pub fn distribute<R: Rng + ?Sized>(
        &self,
        rooms: &mut BTreeMap<String, Room>,
        rng: &mut R,
    ) -> usize {
        let pool = self.build_pool(rooms.len());
        let ids: Vec<String> = rooms.keys().cloned().collect();
        let targets: Vec<&String> = ids.choose_multiple(rng, pool.len()).collect();
        let mut placed = 0;
        for (item, room_id) in pool.into_iter().zip(targets) {
            if let Some(room) = rooms.get_mut(room_id) {
                room.items.push(item);
                placed += 1;
            }
        }
        placed
    }
}
