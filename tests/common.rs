//! Shared fixtures: a small hand-built world and an engine on a manual clock.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use gloomhold::config::Config;
use gloomhold::game::clock::ManualClock;
use gloomhold::game::WorldEngine;
use gloomhold::world::types::{CoinConfig, Direction, Exit, Item, Room, WorldDefinition};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// ```text
///   room_1 (5 gold, respawning) ─east, locked by brass_key─ room_2 (silver_key)
///     │
///   room_0 (start, brass_key)
/// ```
pub fn scenario_world() -> WorldDefinition {
    let rooms = vec![
        Room::new("room_0", "Gatehouse", "A draughty gatehouse.")
            .at(0, 0)
            .with_exit(Direction::North, Exit::open("room_1"))
            .with_item(Item::key("brass_key", "brass key", "lock_1")),
        Room::new("room_1", "Long Hall", "Tapestries rot on the walls.")
            .at(0, -1)
            .with_exit(Direction::South, Exit::open("room_0"))
            .with_exit(Direction::East, Exit::locked("room_2", "lock_1", "brass_key"))
            .with_coins(CoinConfig::respawning(5, 300)),
        Room::new("room_2", "Vault", "Shelves of empty strongboxes.")
            .at(1, -1)
            .with_exit(Direction::West, Exit::locked("room_1", "lock_1", "brass_key"))
            .with_coins(CoinConfig::initial_only(20)),
    ];
    WorldDefinition {
        rooms: rooms
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect::<BTreeMap<_, _>>(),
        starting_room_id: "room_0".into(),
    }
}

/// Defaults without ghosts, so nothing random interferes.
#[allow(dead_code)]
pub fn quiet_config() -> Config {
    let mut config = Config::default();
    config.ghosts.min_ghosts = 0;
    config.ghosts.max_ghosts = 0;
    config
}

#[allow(dead_code)]
pub fn start_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 31, 22, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn scenario_engine(config: &Config) -> (WorldEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let engine = WorldEngine::builder(scenario_world(), config)
        .clock(clock.clone())
        .rng(StdRng::seed_from_u64(7))
        .build();
    (engine, clock)
}
