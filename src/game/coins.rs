//! Coin respawn state machine for a single room.
//!
//! `available` (coins on the floor) → collection records the time and arms a
//! timer (`pending`) → the timer restores the configured amount. Rooms with
//! `initial-only` coins stay empty once collected.

use chrono::{DateTime, Utc};

use crate::game::scheduler::deadline_after;
use crate::game::state::RoomRuntimeState;
use crate::world::types::{CoinConfig, SpawnType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinPhase {
    Available,
    Pending { since: DateTime<Utc> },
    /// Empty and never coming back.
    Depleted,
}

pub fn phase(config: &CoinConfig, state: &RoomRuntimeState) -> CoinPhase {
    match (state.last_coin_spawn, config.spawn_type) {
        (Some(since), SpawnType::RespawnTimer) => CoinPhase::Pending { since },
        _ if state.coins > 0 => CoinPhase::Available,
        _ => CoinPhase::Depleted,
    }
}

/// Record a collection that emptied the room; returns the deadline to arm, if any.
/// A room already waiting keeps its original deadline.
pub fn on_collected(
    config: &CoinConfig,
    state: &mut RoomRuntimeState,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if config.spawn_type != SpawnType::RespawnTimer || state.last_coin_spawn.is_some() {
        return None;
    }
    state.last_coin_spawn = Some(now);
    Some(deadline_after(now, config.respawn_interval()))
}

/// Timer fired: restore coins and leave `pending`. Gold dropped meanwhile is kept.
pub fn respawn(config: &CoinConfig, state: &mut RoomRuntimeState) -> bool {
    if state.last_coin_spawn.take().is_none() {
        return false;
    }
    state.coins = state.coins.max(config.amount);
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Nothing,
    Respawned,
    Armed(DateTime<Utc>),
}

/// After a restart: respawn overdue rooms, re-arm the rest.
pub fn recover(config: &CoinConfig, state: &mut RoomRuntimeState, now: DateTime<Utc>) -> Recovery {
    if config.spawn_type != SpawnType::RespawnTimer {
        state.last_coin_spawn = None;
        return Recovery::Nothing;
    }
    match state.last_coin_spawn {
        None => Recovery::Nothing,
        Some(since) => {
            let due = deadline_after(since, config.respawn_interval());
            if now >= due {
                respawn(config, state);
                Recovery::Respawned
            } else {
                Recovery::Armed(due)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn respawning_room_cycles() {
        let config = CoinConfig::respawning(5, 300);
        let mut state = RoomRuntimeState {
            coins: 5,
            ..Default::default()
        };
        let t0 = Utc::now();
        assert_eq!(phase(&config, &state), CoinPhase::Available);

        state.coins = 0;
        let due = on_collected(&config, &mut state, t0).unwrap();
        assert_eq!(due, t0 + Duration::seconds(300));
        assert_eq!(phase(&config, &state), CoinPhase::Pending { since: t0 });
        assert_eq!(on_collected(&config, &mut state, t0 + Duration::seconds(5)), None);

        assert!(respawn(&config, &mut state));
        assert_eq!(state.coins, 5);
        assert_eq!(state.last_coin_spawn, None);
        assert!(!respawn(&config, &mut state));
    }

    #[test]
    fn initial_only_never_pends() {
        let config = CoinConfig::initial_only(8);
        let mut state = RoomRuntimeState::default();
        assert_eq!(on_collected(&config, &mut state, Utc::now()), None);
        assert_eq!(phase(&config, &state), CoinPhase::Depleted);
    }

    #[test]
    fn respawn_keeps_dropped_gold() {
        let config = CoinConfig::respawning(5, 60);
        let mut state = RoomRuntimeState::default();
        on_collected(&config, &mut state, Utc::now());
        state.coins = 12;
        respawn(&config, &mut state);
        assert_eq!(state.coins, 12);
    }

    #[test]
    fn recovery_catches_up_or_rearms() {
        let config = CoinConfig::respawning(5, 300);
        let t0 = Utc::now();

        let mut overdue = RoomRuntimeState {
            last_coin_spawn: Some(t0),
            ..Default::default()
        };
        assert_eq!(
            recover(&config, &mut overdue, t0 + Duration::seconds(301)),
            Recovery::Respawned
        );
        assert_eq!(overdue.coins, 5);

        let mut waiting = RoomRuntimeState {
            last_coin_spawn: Some(t0),
            ..Default::default()
        };
        assert_eq!(
            recover(&config, &mut waiting, t0 + Duration::seconds(100)),
            Recovery::Armed(t0 + Duration::seconds(300))
        );
        assert_eq!(waiting.coins, 0);
    }
}
