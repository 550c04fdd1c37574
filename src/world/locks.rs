//! Locked doors and their keys.
//!
//! Each lock converts one open edge (both directions) into a locked edge
//! tagged with a fresh key id, then drops exactly one matching key into a
//! room at least `min_key_distance` grid steps away. Keys are kept reachable
//! from the start room without crossing any locked edge, so every world is
//! solvable without luck.

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::config::LocksConfig;
use crate::world::content;
use crate::world::types::{Direction, Exit, ExitKind, Item, WorldDefinition};

/// Where a lock went and where its key ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPlacement {
    pub lock_id: String,
    pub key_id: String,
    pub key_name: String,
    pub room_id: String,
    pub direction: Direction,
    pub destination: String,
    pub key_room_id: String,
    pub key_distance: u32,
}

pub struct LockManager<'a> {
    config: &'a LocksConfig,
}

fn is_open(exit: &Exit) -> bool {
    matches!(exit.kind, ExitKind::Open)
}

fn distance(world: &WorldDefinition, a: &str, b: &str) -> u32 {
    match (
        world.room(a).and_then(|r| r.position),
        world.room(b).and_then(|r| r.position),
    ) {
        (Some(pa), Some(pb)) => pa.manhattan(pb),
        _ => 0,
    }
}

fn key_naming(metals: &[&str], index: usize) -> (String, String) {
    let metal = metals[index % metals.len()];
    let round = index / metals.len();
    if round == 0 {
        (format!("{}_key", metal), format!("{} key", metal))
    } else {
        (
            format!("{}_key_{}", metal, round + 1),
            format!("{} key {}", metal, round + 1),
        )
    }
}

impl<'a> LockManager<'a> {
    pub fn new(config: &'a LocksConfig) -> Self {
        Self { config }
    }

    pub fn add_locks_and_keys<R: Rng + ?Sized>(
        &self,
        world: &mut WorldDefinition,
        rng: &mut R,
    ) -> Vec<LockPlacement> {
        let mut placements = Vec::new();
        if world.room_count() < 2 {
            return placements;
        }
        let (low, high) = (
            self.config.min_locks.min(self.config.max_locks),
            self.config.max_locks.max(self.config.min_locks),
        );
        let wanted = rng.gen_range(low..=high);

        let mut metals: Vec<&str> = content::KEY_METALS.to_vec();
        metals.shuffle(rng);

        for index in 0..wanted {
            let lock_id = format!("lock_{}", index + 1);
            let (key_id, key_name) = key_naming(&metals, index);
            let Some((room_id, direction, destination)) =
                self.lock_random_edge(world, &lock_id, &key_id, &placements, rng)
            else {
                warn!(
                    target: "gloomhold::locks",
                    "no lockable edge found for {} after {} attempts; placed {} of {} locks",
                    lock_id,
                    self.config.max_attempts,
                    placements.len(),
                    wanted
                );
                break;
            };

            let key_room_id = self.choose_key_room(world, &room_id, rng);
            let key_distance = distance(world, &room_id, &key_room_id);
            if let Some(room) = world.rooms.get_mut(&key_room_id) {
                room.items.push(Item::key(&key_id, &key_name, &lock_id));
            }
            debug!(
                target: "gloomhold::locks",
                "{} on {} {} -> {}, key {} in {} ({} steps)",
                lock_id, room_id, direction, destination, key_id, key_room_id, key_distance
            );
            placements.push(LockPlacement {
                lock_id,
                key_id,
                key_name,
                room_id,
                direction,
                destination,
                key_room_id,
                key_distance,
            });
        }
        placements
    }

    /// Lock one random open edge whose locking keeps every placed key reachable.
    fn lock_random_edge<R: Rng + ?Sized>(
        &self,
        world: &mut WorldDefinition,
        lock_id: &str,
        key_id: &str,
        placed: &[LockPlacement],
        rng: &mut R,
    ) -> Option<(String, Direction, String)> {
        let ids: Vec<String> = world.rooms.keys().cloned().collect();
        for _ in 0..self.config.max_attempts.max(1) {
            let room_id = ids.choose(rng)?;
            let room = world.room(room_id)?;
            let candidates: Vec<(Direction, String)> = room
                .exits
                .iter()
                .filter(|(_, exit)| is_open(exit))
                .filter(|(dir, exit)| {
                    world
                        .room(&exit.destination)
                        .and_then(|target| target.exit(dir.opposite()))
                        .map(|back| is_open(back) && back.destination == *room_id)
                        .unwrap_or(false)
                })
                .map(|(dir, exit)| (*dir, exit.destination.clone()))
                .collect();
            let Some((direction, destination)) = candidates.choose(rng).cloned() else {
                continue;
            };

            let locked = Exit::locked(destination.as_str(), lock_id, key_id);
            let mirror = Exit::locked(room_id.as_str(), lock_id, key_id);
            Self::set_exit(world, room_id, direction, locked);
            Self::set_exit(world, &destination, direction.opposite(), mirror);

            let reachable = world.reachable_from(&world.starting_room_id, is_open);
            if reachable.len() > 1 && placed.iter().all(|p| reachable.contains(&p.key_room_id)) {
                return Some((room_id.clone(), direction, destination));
            }
            Self::set_exit(world, room_id, direction, Exit::open(destination.as_str()));
            Self::set_exit(
                world,
                &destination,
                direction.opposite(),
                Exit::open(room_id.as_str()),
            );
        }
        None
    }

    fn set_exit(world: &mut WorldDefinition, room_id: &str, direction: Direction, exit: Exit) {
        if let Some(room) = world.rooms.get_mut(room_id) {
            room.exits.insert(direction, exit);
        }
    }

    /// Far and reachable without keys, then reachable, then far, then any other room.
    fn choose_key_room<R: Rng + ?Sized>(
        &self,
        world: &WorldDefinition,
        lock_room: &str,
        rng: &mut R,
    ) -> String {
        let reachable: HashSet<String> = world.reachable_from(&world.starting_room_id, is_open);
        let others: Vec<&String> = world.rooms.keys().filter(|id| *id != lock_room).collect();
        let far: Vec<&String> = others
            .iter()
            .copied()
            .filter(|id| distance(world, lock_room, id) >= self.config.min_key_distance)
            .collect();
        let far_reachable: Vec<&String> = far
            .iter()
            .copied()
            .filter(|id| reachable.contains(*id))
            .collect();
        let near_reachable: Vec<&String> = others
            .iter()
            .copied()
            .filter(|id| reachable.contains(*id))
            .collect();

        for tier in [&far_reachable, &near_reachable, &far, &others] {
            if let Some(id) = tier.choose(rng) {
                return (*id).clone();
            }
        }
        lock_room.to_string()
    }
}
