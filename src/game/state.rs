//! Mutable runtime state derived from the static world, persisted as one aggregate.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::world::types::{Exit, Item, Room, WorldDefinition};

pub const GAME_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomRuntimeState {
    pub coins: u32,
    #[serde(default)]
    pub object_states: BTreeMap<String, String>,
    /// Set while a respawning room waits for its coins to return.
    #[serde(default)]
    pub last_coin_spawn: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl RoomRuntimeState {
    pub fn from_room(room: &Room) -> Self {
        Self {
            coins: room.coins.amount,
            object_states: room
                .objects
                .iter()
                .map(|o| (o.id.clone(), o.initial_state.clone()))
                .collect(),
            last_coin_spawn: None,
            items: room.items.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    #[default]
    Active,
    Idle,
    Afk,
}

impl PlayerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerStatus::Active => "active",
            PlayerStatus::Idle => "idle",
            PlayerStatus::Afk => "afk",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Inventory {
    pub gold: u32,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Inventory {
    pub fn has_item(&self, item_id: &str) -> bool {
        self.items.iter().any(|i| i.id == item_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSession {
    pub session_id: String,
    pub username: String,
    pub character_id: String,
    pub current_room_id: String,
    pub inventory: Inventory,
    pub status: PlayerStatus,
    pub connected_at: DateTime<Utc>,
    pub last_action: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<DateTime<Utc>>,
}

impl PlayerSession {
    pub fn is_connected(&self) -> bool {
        self.disconnected_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CharacterLock {
    pub session_id: String,
    pub username: String,
    pub locked_at: DateTime<Utc>,
}

/// What [`GameState::reconcile`] had to fix.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub rooms_added: usize,
    pub rooms_dropped: usize,
    pub players_relocated: usize,
    pub locks_dropped: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        *self == ReconcileReport::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub version: u32,
    #[serde(default)]
    pub last_saved: Option<DateTime<Utc>>,
    #[serde(default)]
    pub players: BTreeMap<String, PlayerSession>,
    #[serde(default)]
    pub character_locks: BTreeMap<String, CharacterLock>,
    #[serde(default)]
    pub room_states: BTreeMap<String, RoomRuntimeState>,
    #[serde(default)]
    pub ghost_locations: BTreeMap<String, String>,
    /// Lock ids opened at runtime; both sides of an edge share one id.
    #[serde(default)]
    pub unlocked_locks: BTreeSet<String>,
}

impl GameState {
    pub fn new_for(world: &WorldDefinition) -> Self {
        Self {
            version: GAME_STATE_VERSION,
            last_saved: None,
            players: BTreeMap::new(),
            character_locks: BTreeMap::new(),
            room_states: world
                .rooms
                .values()
                .map(|room| (room.id.clone(), RoomRuntimeState::from_room(room)))
                .collect(),
            ghost_locations: BTreeMap::new(),
            unlocked_locks: BTreeSet::new(),
        }
    }

    /// Bring a loaded state back in line with `world`.
    pub fn reconcile(&mut self, world: &WorldDefinition) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let before = self.room_states.len();
        self.room_states.retain(|id, _| world.rooms.contains_key(id));
        report.rooms_dropped = before - self.room_states.len();
        for room in world.rooms.values() {
            let state = self.room_states.entry(room.id.clone()).or_insert_with(|| {
                report.rooms_added += 1;
                RoomRuntimeState::from_room(room)
            });
            state
                .object_states
                .retain(|id, s| room.objects.iter().any(|o| &o.id == id && o.states.contains_key(s.as_str())));
            for object in &room.objects {
                state
                    .object_states
                    .entry(object.id.clone())
                    .or_insert_with(|| object.initial_state.clone());
            }
        }

        for player in self.players.values_mut() {
            if !world.rooms.contains_key(&player.current_room_id) {
                player.current_room_id = world.starting_room_id.clone();
                report.players_relocated += 1;
            }
        }

        let players = &self.players;
        let before = self.character_locks.len();
        self.character_locks.retain(|character_id, lock| {
            players
                .get(&lock.session_id)
                .map(|p| &p.character_id == character_id)
                .unwrap_or(false)
        });
        report.locks_dropped = before - self.character_locks.len();
        for player in self.players.values() {
            self.character_locks
                .entry(player.character_id.clone())
                .or_insert_with(|| CharacterLock {
                    session_id: player.session_id.clone(),
                    username: player.username.clone(),
                    locked_at: player.connected_at,
                });
        }

        let known_locks: BTreeSet<&str> = world.locked_exits().filter_map(|(_, _, e)| e.lock_id()).collect();
        self.unlocked_locks.retain(|id| known_locks.contains(id.as_str()));
        self.version = GAME_STATE_VERSION;

        if report.is_clean() {
            info!(target: "gloomhold::persistence", "game state matches world definition");
        } else {
            warn!(target: "gloomhold::persistence", "game state reconciled: {:?}", report);
        }
        report
    }

    /// Locked iff statically locked and not opened at runtime.
    pub fn is_exit_locked(&self, exit: &Exit) -> bool {
        exit.lock_id()
            .map(|id| !self.unlocked_locks.contains(id))
            .unwrap_or(false)
    }

    pub fn sessions_in_room<'a>(
        &'a self,
        room_id: &'a str,
    ) -> impl Iterator<Item = &'a PlayerSession> + 'a {
        self.players
            .values()
            .filter(move |p| p.current_room_id == room_id)
    }

    /// Gold on floors plus gold in purses.
    pub fn gold_in_circulation(&self) -> u64 {
        let floors: u64 = self.room_states.values().map(|r| u64::from(r.coins)).sum();
        let purses: u64 = self.players.values().map(|p| u64::from(p.inventory.gold)).sum();
        floors + purses
    }
}
