//! 5×5 window around the player, one symbol per grid cell.

use std::collections::HashMap;
use std::fmt;

use crate::game::state::GameState;
use crate::world::types::{GridPosition, Room, WorldDefinition};

pub const RADIUS: i32 = 2;
pub const SIZE: usize = (RADIUS as usize) * 2 + 1;

/// Cell contents in descending priority after the player marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapCell {
    Player,
    LockedDoor,
    Item,
    Gold,
    Connected,
    Distant,
    Blank,
    Unknown,
}

impl MapCell {
    pub fn symbol(self) -> char {
        match self {
            MapCell::Player => '@',
            MapCell::LockedDoor => 'L',
            MapCell::Item => 'i',
            MapCell::Gold => '$',
            MapCell::Connected => '+',
            MapCell::Distant => '.',
            MapCell::Blank => ' ',
            MapCell::Unknown => '?',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minimap {
    pub cells: [[MapCell; SIZE]; SIZE],
}

impl Minimap {
    /// Shown when the current room has no grid position.
    pub fn placeholder() -> Self {
        let mut cells = [[MapCell::Unknown; SIZE]; SIZE];
        cells[RADIUS as usize][RADIUS as usize] = MapCell::Player;
        Self { cells }
    }

    pub fn render(world: &WorldDefinition, state: &GameState, room_id: &str) -> Self {
        let Some(current) = world.room(room_id) else {
            return Self::placeholder();
        };
        let Some(origin) = current.position else {
            return Self::placeholder();
        };
        let by_position: HashMap<GridPosition, &Room> = world
            .rooms
            .values()
            .filter_map(|r| r.position.map(|p| (p, r)))
            .collect();

        let mut cells = [[MapCell::Blank; SIZE]; SIZE];
        for dy in -RADIUS..=RADIUS {
            for dx in -RADIUS..=RADIUS {
                let cell = if dx == 0 && dy == 0 {
                    MapCell::Player
                } else {
                    let at = GridPosition::new(origin.x + dx, origin.y + dy);
                    match by_position.get(&at) {
                        Some(room) => classify(current, room, state),
                        None => MapCell::Blank,
                    }
                };
                cells[(dy + RADIUS) as usize][(dx + RADIUS) as usize] = cell;
            }
        }
        Self { cells }
    }

    pub fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.symbol().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    pub fn legend() -> &'static str {
        "@ you  L locked door  i item  $ gold  + connected  . room"
    }
}

fn classify(current: &Room, room: &Room, state: &GameState) -> MapCell {
    let runtime = state.room_states.get(&room.id);
    if room.exits.values().any(|exit| state.is_exit_locked(exit)) {
        MapCell::LockedDoor
    } else if runtime.map(|r| !r.items.is_empty()).unwrap_or(false) {
        MapCell::Item
    } else if runtime.map(|r| r.coins > 0).unwrap_or(false) {
        MapCell::Gold
    } else if current.is_linked_to(room) {
        MapCell::Connected
    } else {
        MapCell::Distant
    }
}

impl fmt::Display for Minimap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rows().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::{CoinConfig, Direction, Exit, Item, ItemCategory};
    use std::collections::BTreeMap;

    fn world() -> WorldDefinition {
        let rooms = vec![
            Room::new("c", "Centre", "")
                .at(5, 5)
                .with_exit(Direction::East, Exit::open("e")),
            Room::new("e", "East", "")
                .at(6, 5)
                .with_exit(Direction::West, Exit::open("c"))
                .with_coins(CoinConfig::initial_only(3))
                .with_item(Item::new("rope", "rope", "", ItemCategory::Tool)),
            Room::new("n", "North", "").at(5, 4),
            Room::new("w", "West", "")
                .at(4, 5)
                .with_coins(CoinConfig::initial_only(2)),
            Room::new("far", "Far", "")
                .at(7, 7)
                .with_exit(Direction::North, Exit::locked("x", "lock_1", "k")),
            Room::new("x", "X", "")
                .at(7, 6)
                .with_exit(Direction::South, Exit::locked("far", "lock_1", "k")),
            Room::new("off", "Off", "").at(20, 20),
            Room::new("nowhere", "Nowhere", ""),
        ];
        WorldDefinition {
            rooms: rooms
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect::<BTreeMap<_, _>>(),
            starting_room_id: "c".into(),
        }
    }

    #[test]
    fn symbols_follow_priority() {
        let world = world();
        let mut state = GameState::new_for(&world);
        let map = Minimap::render(&world, &state, "c");
        assert_eq!(map.cells[2][2], MapCell::Player);
        assert_eq!(map.cells[2][3], MapCell::Item);
        assert_eq!(map.cells[1][2], MapCell::Distant);
        assert_eq!(map.cells[2][1], MapCell::Gold);
        assert_eq!(map.cells[4][4], MapCell::LockedDoor);
        assert_eq!(map.cells[3][4], MapCell::LockedDoor);
        assert_eq!(map.cells[0][0], MapCell::Blank);

        state.room_states.get_mut("e").unwrap().items.clear();
        state.room_states.get_mut("e").unwrap().coins = 0;
        state.unlocked_locks.insert("lock_1".into());
        let map = Minimap::render(&world, &state, "c");
        assert_eq!(map.cells[2][3], MapCell::Connected);
        assert_eq!(map.cells[4][4], MapCell::Distant);
    }

    #[test]
    fn missing_position_gives_placeholder() {
        let world = world();
        let state = GameState::new_for(&world);
        let map = Minimap::render(&world, &state, "nowhere");
        assert_eq!(map, Minimap::placeholder());
        assert_eq!(map.rows().len(), SIZE);
        assert!(map.to_string().contains('@'));
    }
}
