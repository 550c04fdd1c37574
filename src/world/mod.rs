//! Static world: the data model and the generators that build it once.

pub mod content;
pub mod definitions;
pub mod gold;
pub mod items;
pub mod locks;
pub mod mapgen;
pub mod types;

use log::info;
use rand::Rng;

use crate::config::Config;
use gold::GoldDistributor;
use items::ItemGenerator;
use locks::{LockManager, LockPlacement};
use mapgen::MapGenerator;
pub use types::{Direction, Exit, ExitKind, Item, Room, WorldDefinition};

/// Output of the full generation pipeline.
#[derive(Debug, Clone)]
pub struct GeneratedWorld {
    pub world: WorldDefinition,
    pub locks: Vec<LockPlacement>,
    pub forced_links: usize,
    pub below_target: usize,
    pub items_placed: usize,
}

/// Map, then gold, then items, then locks and keys.
pub fn generate_world<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> GeneratedWorld {
    let map = MapGenerator::new(&config.world).generate(config.world.room_count, rng);
    let below_target = map.below_target();
    let forced_links = map.forced_links;
    let mut world = map.world;

    GoldDistributor::new(&config.gold).distribute(world.rooms.values_mut(), rng);
    let items_placed = ItemGenerator::new(&config.items).distribute(&mut world.rooms, rng);
    let locks = LockManager::new(&config.locks).add_locks_and_keys(&mut world, rng);

    info!(
        "world generated: {} rooms, {} items, {} locks, {} forced links, {} rooms below target degree",
        world.room_count(),
        items_placed,
        locks.len(),
        forced_links,
        below_target
    );

    GeneratedWorld {
        world,
        locks,
        forced_links,
        below_target,
        items_placed,
    }
}
