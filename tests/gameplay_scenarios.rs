// End-to-end player flows against a hand-built three-room world.

mod common;

use chrono::Duration;
use gloomhold::game::events::EventKind;
use gloomhold::game::PlayerCommand;
use gloomhold::world::types::Direction;
use gloomhold::WorldError;

#[test]
fn walk_north_and_collect_five_gold() {
    let config = common::quiet_config();
    let (mut engine, _clock) = common::scenario_engine(&config);
    engine.add_player("s1", "ada", "char_1").unwrap();

    let reply = engine.execute("s1", PlayerCommand::parse("n")).unwrap();
    assert!(reply.message.contains("Long Hall"));
    assert!(reply.message.contains("5 gold coins lie here"));

    engine.execute("s1", PlayerCommand::parse("collect")).unwrap();
    let state = engine.state();
    assert_eq!(state.players["s1"].inventory.gold, 5);
    assert_eq!(state.room_states["room_1"].coins, 0);
}

#[test]
fn collected_gold_respawns_after_interval() {
    let config = common::quiet_config();
    let (mut engine, clock) = common::scenario_engine(&config);
    engine.add_player("s1", "ada", "char_1").unwrap();
    engine.move_player("s1", Direction::North).unwrap();
    engine.collect_coins("s1").unwrap();
    assert_eq!(
        engine.state().room_states["room_1"].last_coin_spawn,
        Some(common::start_time())
    );

    clock.advance(Duration::seconds(300));
    engine.tick();
    let room = &engine.state().room_states["room_1"];
    assert_eq!(room.coins, 5);
    assert_eq!(room.last_coin_spawn, None);
}

#[test]
fn initial_only_gold_never_returns() {
    let config = common::quiet_config();
    let (mut engine, clock) = common::scenario_engine(&config);
    engine.add_player("s1", "ada", "char_1").unwrap();
    engine.interact("s1", "take", "brass key").unwrap();
    engine.move_player("s1", Direction::North).unwrap();
    engine.move_player("s1", Direction::East).unwrap();
    engine.collect_coins("s1").unwrap();
    clock.advance(Duration::days(2));
    engine.tick();
    assert_eq!(engine.state().room_states["room_2"].coins, 0);
    assert!(engine.state().room_states["room_2"].last_coin_spawn.is_none());
}

#[test]
fn brass_key_opens_the_east_door_for_everyone() {
    let config = common::quiet_config();
    let (mut engine, _clock) = common::scenario_engine(&config);
    engine.add_player("s1", "ada", "char_1").unwrap();
    engine.add_player("s2", "bob", "char_2").unwrap();
    engine.move_player("s2", Direction::North).unwrap();

    let err = engine.move_player("s2", Direction::East).unwrap_err();
    assert!(matches!(err, WorldError::LockedPath { ref key_id, .. } if key_id == "brass_key"));
    assert!(err.to_string().contains("brass key"));
    assert!(!err.is_fatal());

    engine.interact("s1", "get", "brass key").unwrap();
    engine.move_player("s1", Direction::North).unwrap();
    let reply = engine.move_player("s1", Direction::East).unwrap();
    let unlock = reply
        .events
        .iter()
        .find(|e| e.kind == EventKind::Unlock)
        .expect("unlock broadcast");
    assert_eq!(engine.recipients(&unlock.audience), vec!["s2".to_string()]);

    // bob has no key but the door is open now, from both sides
    engine.move_player("s2", Direction::East).unwrap();
    engine.move_player("s2", Direction::West).unwrap();
    assert_eq!(engine.state().players["s2"].current_room_id, "room_1");
}

#[test]
fn failed_operations_change_nothing() {
    let config = common::quiet_config();
    let (mut engine, _clock) = common::scenario_engine(&config);
    engine.add_player("s1", "ada", "char_1").unwrap();
    let before = engine.snapshot();

    assert!(engine.move_player("s1", Direction::South).is_err());
    assert!(engine.collect_coins("s1").is_err());
    assert!(engine.drop_coins("s1").is_err());
    assert!(engine.interact("s1", "pull", "lever").is_err());
    assert!(engine.say("s1", "").is_err());
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn gold_is_conserved_between_floor_and_purse() {
    let config = common::quiet_config();
    let (mut engine, _clock) = common::scenario_engine(&config);
    engine.add_player("s1", "ada", "char_1").unwrap();
    let total = engine.state().gold_in_circulation();

    engine.move_player("s1", Direction::North).unwrap();
    engine.collect_coins("s1").unwrap();
    assert_eq!(engine.state().gold_in_circulation(), total);
    engine.move_player("s1", Direction::South).unwrap();
    engine.drop_coins("s1").unwrap();
    assert_eq!(engine.state().gold_in_circulation(), total);
    assert_eq!(engine.state().room_states["room_0"].coins, 5);
}

#[test]
fn minimap_marks_player_gold_and_locked_door() {
    let config = common::quiet_config();
    let (mut engine, _clock) = common::scenario_engine(&config);
    engine.add_player("s1", "ada", "char_1").unwrap();
    let reply = engine.minimap("s1").unwrap();
    let rows: Vec<&str> = reply.message.lines().take(5).collect();
    assert_eq!(rows[2].chars().nth(4), Some('@'));
    // room_1 sits directly north and holds the locked east door
    assert_eq!(rows[1].chars().nth(4), Some('L'));
    // room_2 is north-east of the start
    assert_eq!(rows[1].chars().nth(6), Some('L'));
}
