// Generated worlds: connectivity, mirrored exits, lock/key placement, gold bounds.

use std::collections::{BTreeMap, HashSet};

use gloomhold::config::Config;
use gloomhold::world::generate_world;
use gloomhold::world::items::ItemGenerator;
use gloomhold::world::types::{ExitKind, ItemCategory, WorldDefinition};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn generate(rooms: usize, seed: u64) -> gloomhold::world::GeneratedWorld {
    let mut config = Config::default();
    config.world.room_count = rooms;
    let mut rng = StdRng::seed_from_u64(seed);
    generate_world(&config, &mut rng)
}

fn assert_exits_mirrored(world: &WorldDefinition) {
    for room in world.rooms.values() {
        for (direction, exit) in &room.exits {
            let target = world
                .room(&exit.destination)
                .unwrap_or_else(|| panic!("{} leads nowhere", room.id));
            let back = target
                .exit(direction.opposite())
                .unwrap_or_else(|| panic!("{} {} has no way back", room.id, direction));
            assert_eq!(back.destination, room.id);
            assert_eq!(back.kind, exit.kind, "lock state differs across {}", room.id);
            let (from, to) = (room.position.unwrap(), target.position.unwrap());
            assert_eq!(from.step(*direction), to, "exit does not follow the grid");
        }
    }
}

#[test]
fn every_room_is_reachable_across_sizes_and_seeds() {
    for rooms in [1usize, 2, 5, 30, 100] {
        for seed in 0..8 {
            let generated = generate(rooms, seed);
            let world = &generated.world;
            assert_eq!(world.room_count(), rooms);
            assert!(world.is_fully_reachable(), "rooms {} seed {}", rooms, seed);
            assert!(world.validate().is_ok());
            assert_exits_mirrored(world);
            let positions: HashSet<_> = world.rooms.values().map(|r| r.position).collect();
            assert_eq!(positions.len(), rooms, "two rooms share a cell");
        }
    }
}

#[test]
fn locks_have_one_reachable_key_each() {
    for seed in 0..10 {
        let generated = generate(60, seed);
        let world = &generated.world;
        assert!(generated.locks.len() >= 1, "seed {} placed no locks", seed);

        let mut sides: BTreeMap<&str, usize> = BTreeMap::new();
        for (_, _, exit) in world.locked_exits() {
            *sides.entry(exit.lock_id().unwrap()).or_default() += 1;
        }
        assert_eq!(sides.len(), generated.locks.len());
        assert!(sides.values().all(|n| *n == 2));

        let open_only = world.reachable_from(&world.starting_room_id, |e| {
            matches!(e.kind, ExitKind::Open)
        });
        for lock in &generated.locks {
            let holders: Vec<_> = world
                .rooms
                .values()
                .filter(|r| r.items.iter().any(|i| i.id == lock.key_id))
                .collect();
            assert_eq!(holders.len(), 1, "{} should exist exactly once", lock.key_id);
            assert_eq!(holders[0].id, lock.key_room_id);
            assert!(
                open_only.contains(&lock.key_room_id),
                "seed {}: {} unreachable without keys",
                seed,
                lock.key_id
            );
        }
        let key_ids: HashSet<_> = generated.locks.iter().map(|l| &l.key_id).collect();
        assert_eq!(key_ids.len(), generated.locks.len());
    }
}

#[test]
fn gold_and_items_follow_configuration() {
    let config = Config::default();
    let generated = generate(100, 3);
    let world = &generated.world;
    for room in world.rooms.values() {
        assert!(room.coins.amount >= config.gold.min && room.coins.amount <= config.gold.max);
    }
    let loot = world
        .rooms
        .values()
        .flat_map(|r| r.items.iter())
        .filter(|i| i.category != ItemCategory::Key)
        .count();
    assert_eq!(loot, ItemGenerator::new(&config.items).pool_size(100));
    assert_eq!(loot, generated.items_placed);
}

#[test]
fn same_seed_same_world() {
    assert_eq!(generate(40, 11).world, generate(40, 11).world);
}
