use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use crate::errors::WorldError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Grid delta; north is towards smaller `y`.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    /// Accepts full names and single-letter abbreviations, case-insensitively.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Some(Direction::North),
            "s" | "south" => Some(Direction::South),
            "e" | "east" => Some(Direction::East),
            "w" | "west" => Some(Direction::West),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: GridPosition) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Static lock state of an exit. Runtime unlocks are tracked in `GameState`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitKind {
    Open,
    Locked { lock_id: String, key_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exit {
    pub destination: String,
    pub kind: ExitKind,
}

impl Exit {
    pub fn open(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            kind: ExitKind::Open,
        }
    }

    pub fn locked(
        destination: impl Into<String>,
        lock_id: impl Into<String>,
        key_id: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.into(),
            kind: ExitKind::Locked {
                lock_id: lock_id.into(),
                key_id: key_id.into(),
            },
        }
    }

    pub fn lock_id(&self) -> Option<&str> {
        match &self.kind {
            ExitKind::Open => None,
            ExitKind::Locked { lock_id, .. } => Some(lock_id),
        }
    }

    pub fn required_key(&self) -> Option<&str> {
        match &self.kind {
            ExitKind::Open => None,
            ExitKind::Locked { key_id, .. } => Some(key_id),
        }
    }
}

/// Longest timer any config value or world file may ask for (ten years).
pub const MAX_TIMER_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Seconds as a timer length, capped at [`MAX_TIMER_SECS`].
pub fn timer_duration(secs: u64) -> chrono::Duration {
    let capped = secs.min(MAX_TIMER_SECS) as i64;
    chrono::Duration::try_seconds(capped).unwrap_or(chrono::Duration::zero())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SpawnType {
    /// Coins are placed once and never come back after collection.
    #[default]
    InitialOnly,
    /// Coins return `respawn_interval_secs` after the room is emptied.
    RespawnTimer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CoinConfig {
    pub spawn_type: SpawnType,
    pub amount: u32,
    pub respawn_interval_secs: u64,
}

impl CoinConfig {
    pub fn respawning(amount: u32, respawn_interval_secs: u64) -> Self {
        Self {
            spawn_type: SpawnType::RespawnTimer,
            amount,
            respawn_interval_secs,
        }
    }

    pub fn initial_only(amount: u32) -> Self {
        Self {
            spawn_type: SpawnType::InitialOnly,
            amount,
            respawn_interval_secs: 0,
        }
    }

    pub fn respawn_interval(&self) -> chrono::Duration {
        timer_duration(self.respawn_interval_secs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Weapon,
    Armor,
    Consumable,
    Treasure,
    Tool,
    Key,
}

impl ItemCategory {
    /// Categories the item generator fills, in allocation order.
    pub const GENERATED: [ItemCategory; 5] = [
        ItemCategory::Weapon,
        ItemCategory::Armor,
        ItemCategory::Consumable,
        ItemCategory::Treasure,
        ItemCategory::Tool,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemCategory::Weapon => "weapon",
            ItemCategory::Armor => "armor",
            ItemCategory::Consumable => "consumable",
            ItemCategory::Treasure => "treasure",
            ItemCategory::Tool => "tool",
            ItemCategory::Key => "key",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ItemCategory,
    /// Lock id this item opens, for keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocks: Option<String>,
}

impl Item {
    pub fn new(id: &str, name: &str, description: &str, category: ItemCategory) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            category,
            unlocks: None,
        }
    }

    pub fn key(id: &str, name: &str, lock_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("A heavy {} worn smooth by many hands.", name),
            category: ItemCategory::Key,
            unlocks: Some(lock_id.to_string()),
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.id.eq_ignore_ascii_case(query) || self.name.eq_ignore_ascii_case(query)
    }
}

/// Effect of a verb applied to an object in a given state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interaction {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_item: Option<Item>,
    #[serde(default)]
    pub coins: u32,
}

impl Interaction {
    pub fn say(message: &str) -> Self {
        Self {
            message: message.to_string(),
            next_state: None,
            grant_item: None,
            coins: 0,
        }
    }

    pub fn then(mut self, state: &str) -> Self {
        self.next_state = Some(state.to_string());
        self
    }

    pub fn granting(mut self, item: Item) -> Self {
        self.grant_item = Some(item);
        self
    }

    pub fn paying(mut self, coins: u32) -> Self {
        self.coins = coins;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectState {
    pub description: String,
    /// Allowed verbs in this state.
    #[serde(default)]
    pub interactions: BTreeMap<String, Interaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomObject {
    pub id: String,
    pub name: String,
    pub initial_state: String,
    pub states: BTreeMap<String, ObjectState>,
}

impl RoomObject {
    pub fn new(id: &str, name: &str, initial_state: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            initial_state: initial_state.to_string(),
            states: BTreeMap::new(),
        }
    }

    pub fn with_state(
        mut self,
        state: &str,
        description: &str,
        interactions: Vec<(&str, Interaction)>,
    ) -> Self {
        self.states.insert(
            state.to_string(),
            ObjectState {
                description: description.to_string(),
                interactions: interactions
                    .into_iter()
                    .map(|(verb, effect)| (verb.to_string(), effect))
                    .collect(),
            },
        );
        self
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.id.eq_ignore_ascii_case(query) || self.name.eq_ignore_ascii_case(query)
    }

    pub fn state(&self, name: &str) -> Option<&ObjectState> {
        self.states.get(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub exits: BTreeMap<Direction, Exit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<GridPosition>,
    #[serde(default)]
    pub objects: Vec<RoomObject>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub coins: CoinConfig,
}

impl Room {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            exits: BTreeMap::new(),
            position: None,
            objects: Vec::new(),
            items: Vec::new(),
            coins: CoinConfig::default(),
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Some(GridPosition::new(x, y));
        self
    }

    pub fn with_exit(mut self, direction: Direction, exit: Exit) -> Self {
        self.exits.insert(direction, exit);
        self
    }

    pub fn with_coins(mut self, coins: CoinConfig) -> Self {
        self.coins = coins;
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_object(mut self, object: RoomObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn exit(&self, direction: Direction) -> Option<&Exit> {
        self.exits.get(&direction)
    }

    /// True when either room has an exit leading to the other.
    pub fn is_linked_to(&self, other: &Room) -> bool {
        self.exits.values().any(|e| e.destination == other.id)
            || other.exits.values().any(|e| e.destination == self.id)
    }
}

/// The static map. Produced once by the generators and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldDefinition {
    pub rooms: BTreeMap<String, Room>,
    pub starting_room_id: String,
}

impl WorldDefinition {
    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn starting_room(&self) -> Option<&Room> {
        self.rooms.get(&self.starting_room_id)
    }

    /// Breadth-first reachability from `start`; `passable` decides which exits may be crossed.
    pub fn reachable_from<F>(&self, start: &str, passable: F) -> HashSet<String>
    where
        F: Fn(&Exit) -> bool,
    {
        let mut seen = HashSet::new();
        if !self.rooms.contains_key(start) {
            return seen;
        }
        let mut queue = VecDeque::new();
        seen.insert(start.to_string());
        queue.push_back(start.to_string());
        while let Some(id) = queue.pop_front() {
            let Some(room) = self.rooms.get(&id) else {
                continue;
            };
            for exit in room.exits.values() {
                if passable(exit) && seen.insert(exit.destination.clone()) {
                    queue.push_back(exit.destination.clone());
                }
            }
        }
        seen
    }

    /// Every room reachable from the starting room, ignoring locks.
    pub fn is_fully_reachable(&self) -> bool {
        self.reachable_from(&self.starting_room_id, |_| true).len() == self.rooms.len()
    }

    /// All locked exits as `(room id, direction, exit)`.
    pub fn locked_exits(&self) -> impl Iterator<Item = (&str, Direction, &Exit)> {
        self.rooms.values().flat_map(|room| {
            room.exits
                .iter()
                .filter(|(_, exit)| exit.lock_id().is_some())
                .map(move |(dir, exit)| (room.id.as_str(), *dir, exit))
        })
    }

    /// Display name of the key with this id, looked up among room items.
    pub fn key_name(&self, key_id: &str) -> Option<&str> {
        self.rooms
            .values()
            .flat_map(|room| room.items.iter())
            .find(|item| item.id == key_id)
            .map(|item| item.name.as_str())
    }

    /// Structural checks for hand-authored or reloaded definitions.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !self.rooms.contains_key(&self.starting_room_id) {
            return Err(WorldError::definition(
                "world",
                format!("starting room '{}' does not exist", self.starting_room_id),
            ));
        }
        for (id, room) in &self.rooms {
            if &room.id != id {
                return Err(WorldError::definition(
                    "world",
                    format!("room keyed '{}' carries id '{}'", id, room.id),
                ));
            }
            for (direction, exit) in &room.exits {
                let Some(target) = self.rooms.get(&exit.destination) else {
                    return Err(WorldError::definition(
                        "world",
                        format!(
                            "exit {} of '{}' leads to unknown room '{}'",
                            direction, id, exit.destination
                        ),
                    ));
                };
                if let ExitKind::Locked { .. } = exit.kind {
                    let mirror = target.exit(direction.opposite());
                    if mirror.map(|m| &m.kind) != Some(&exit.kind) {
                        return Err(WorldError::definition(
                            "world",
                            format!(
                                "locked exit {} of '{}' has no matching mirror in '{}'",
                                direction, id, target.id
                            ),
                        ));
                    }
                }
            }
            if let Some(object) = room
                .objects
                .iter()
                .find(|o| !o.states.contains_key(&o.initial_state))
            {
                return Err(WorldError::definition(
                    "world",
                    format!("object '{}' in '{}' has no initial state", object.id, id),
                ));
            }
            if room.coins.spawn_type == SpawnType::RespawnTimer
                && !(1..=MAX_TIMER_SECS).contains(&room.coins.respawn_interval_secs)
            {
                return Err(WorldError::definition(
                    "world",
                    format!(
                        "room '{}' respawns coins every {}s (allowed 1..={})",
                        id, room.coins.respawn_interval_secs, MAX_TIMER_SECS
                    ),
                ));
            }
        }
        Ok(())
    }
}
