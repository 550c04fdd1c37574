//! Wandering ghosts: spawned once, moved on a fixed interval, and resolved
//! against players who walk into their room.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use crate::config::GhostsConfig;
use crate::game::state::GameState;
use crate::world::content;
use crate::world::types::{Direction, WorldDefinition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ghost {
    pub id: String,
    pub name: String,
    pub description: String,
    pub current_room_id: String,
    pub move_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhostMove {
    pub ghost_id: String,
    pub ghost_name: String,
    pub from: String,
    pub to: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterOutcome {
    /// The ghost was seen but did nothing.
    Observed,
    /// The ghost struck a player with an empty purse.
    NoLoss,
    GoldLost { lost: u32, remaining: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encounter {
    pub ghost_id: String,
    pub ghost_name: String,
    pub outcome: EncounterOutcome,
}

impl Encounter {
    pub fn gold_lost(&self) -> u32 {
        match self.outcome {
            EncounterOutcome::GoldLost { lost, .. } => lost,
            _ => 0,
        }
    }

    pub fn message(&self) -> String {
        match self.outcome {
            EncounterOutcome::Observed => format!(
                "The {} drifts through the room, paying you no attention.",
                self.ghost_name
            ),
            EncounterOutcome::NoLoss => format!(
                "The {} rushes through you, rummages at your empty purse, and wails in disappointment.",
                self.ghost_name
            ),
            EncounterOutcome::GoldLost { lost, remaining } => format!(
                "The {} rushes through you! You lose {} gold. You have {} gold left.",
                self.ghost_name, lost, remaining
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GhostManager {
    ghosts: BTreeMap<String, Ghost>,
    encounter_probability: f64,
    loss_min_pct: f64,
    loss_max_pct: f64,
}

impl GhostManager {
    /// Create the ghost population. Saved locations are restored; ghosts whose
    /// saved room no longer exists, and fresh ghosts, start in random rooms.
    pub fn spawn<R: Rng + ?Sized>(
        config: &GhostsConfig,
        world: &WorldDefinition,
        saved: &BTreeMap<String, String>,
        rng: &mut R,
    ) -> Self {
        let room_ids: Vec<&String> = world.rooms.keys().collect();
        let count = if saved.is_empty() {
            let (low, high) = (
                config.min_ghosts.min(config.max_ghosts),
                config.max_ghosts.max(config.min_ghosts),
            );
            rng.gen_range(low..=high)
        } else {
            saved.len()
        };

        let mut ghosts = BTreeMap::new();
        let ids: Vec<String> = if saved.is_empty() {
            (1..=count).map(|n| format!("ghost_{}", n)).collect()
        } else {
            saved.keys().cloned().collect()
        };
        for (index, id) in ids.into_iter().enumerate() {
            let restored = saved.get(&id).filter(|room| world.rooms.contains_key(*room));
            let room = match restored {
                Some(room) => room.clone(),
                None => match room_ids.choose(rng) {
                    Some(room) => (*room).clone(),
                    None => continue,
                },
            };
            let (name, description) = content::GHOST_TEMPLATES
                [index % content::GHOST_TEMPLATES.len()];
            info!(target: "gloomhold::ghosts", "{} ({}) haunts {}", id, name, room);
            ghosts.insert(
                id.clone(),
                Ghost {
                    id,
                    name: name.to_string(),
                    description: description.to_string(),
                    current_room_id: room,
                    move_count: 0,
                },
            );
        }

        Self {
            ghosts,
            encounter_probability: config.encounter_probability.clamp(0.0, 1.0),
            loss_min_pct: config.gold_loss_min_pct,
            loss_max_pct: config.gold_loss_max_pct.max(config.gold_loss_min_pct),
        }
    }

    pub fn ghosts(&self) -> impl Iterator<Item = &Ghost> {
        self.ghosts.values()
    }

    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    /// `ghostId → roomId`, the persisted form.
    pub fn locations(&self) -> BTreeMap<String, String> {
        self.ghosts
            .values()
            .map(|g| (g.id.clone(), g.current_room_id.clone()))
            .collect()
    }

    pub fn ghosts_in_room<'a>(&'a self, room_id: &'a str) -> impl Iterator<Item = &'a Ghost> + 'a {
        self.ghosts
            .values()
            .filter(move |g| g.current_room_id == room_id)
    }

    /// Move every ghost through a random unlocked exit. Ghosts with none stay put.
    pub fn move_all<R: Rng + ?Sized>(
        &mut self,
        world: &WorldDefinition,
        state: &GameState,
        rng: &mut R,
    ) -> Vec<GhostMove> {
        let mut moves = Vec::new();
        for ghost in self.ghosts.values_mut() {
            let Some(room) = world.room(&ghost.current_room_id) else {
                continue;
            };
            let open: Vec<(Direction, &str)> = room
                .exits
                .iter()
                .filter(|(_, exit)| !state.is_exit_locked(exit))
                .map(|(dir, exit)| (*dir, exit.destination.as_str()))
                .collect();
            let Some(&(direction, to)) = open.choose(rng) else {
                continue;
            };
            let from = std::mem::replace(&mut ghost.current_room_id, to.to_string());
            ghost.move_count += 1;
            debug!(
                target: "gloomhold::ghosts",
                "{} drifts {} from {} to {}", ghost.id, direction, from, to
            );
            moves.push(GhostMove {
                ghost_id: ghost.id.clone(),
                ghost_name: ghost.name.clone(),
                from,
                to: to.to_string(),
                direction,
            });
        }
        moves
    }

    /// Gold taken from a purse of `gold`: at least 1, at most everything.
    pub fn resolve_loss<R: Rng + ?Sized>(&self, gold: u32, rng: &mut R) -> u32 {
        if gold == 0 {
            return 0;
        }
        let pct = rng.gen_range(self.loss_min_pct..=self.loss_max_pct);
        let lost = (f64::from(gold) * pct / 100.0).floor() as u32;
        lost.max(1).min(gold)
    }

    /// Resolve a player entering `room_id` carrying `gold`. The first ghost
    /// by id answers when several share the room.
    pub fn check_encounter<R: Rng + ?Sized>(
        &self,
        room_id: &str,
        gold: u32,
        rng: &mut R,
    ) -> Option<Encounter> {
        let ghost = self.ghosts_in_room(room_id).next()?;
        let outcome = if rng.gen_bool(self.encounter_probability) {
            if gold == 0 {
                EncounterOutcome::NoLoss
            } else {
                let lost = self.resolve_loss(gold, rng);
                EncounterOutcome::GoldLost {
                    lost,
                    remaining: gold - lost,
                }
            }
        } else {
            EncounterOutcome::Observed
        };
        Some(Encounter {
            ghost_id: ghost.id.clone(),
            ghost_name: ghost.name.clone(),
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::world::mapgen::MapGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(config: &GhostsConfig, seed: u64) -> (WorldDefinition, GhostManager, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let world = MapGenerator::new(&WorldConfig::default())
            .generate(25, &mut rng)
            .world;
        let ghosts = GhostManager::spawn(config, &world, &BTreeMap::new(), &mut rng);
        (world, ghosts, rng)
    }

    #[test]
    fn spawn_respects_count_range_and_restores_locations() {
        let config = GhostsConfig {
            min_ghosts: 2,
            max_ghosts: 3,
            ..GhostsConfig::default()
        };
        let (world, ghosts, mut rng) = setup(&config, 1);
        assert!((2..=3).contains(&ghosts.len()));

        let mut saved = ghosts.locations();
        saved.insert("ghost_1".into(), "room_7".into());
        saved.insert("ghost_2".into(), "gone".into());
        let restored = GhostManager::spawn(&config, &world, &saved, &mut rng);
        let locations = restored.locations();
        assert_eq!(locations.len(), saved.len());
        assert_eq!(locations["ghost_1"], "room_7");
        assert!(world.rooms.contains_key(&locations["ghost_2"]));
    }

    #[test]
    fn ghosts_move_through_open_exits() {
        let config = GhostsConfig::default();
        let (world, mut ghosts, mut rng) = setup(&config, 2);
        let state = GameState::new_for(&world);
        for _ in 0..20 {
            for m in ghosts.move_all(&world, &state, &mut rng) {
                let exit = world.room(&m.from).unwrap().exit(m.direction).unwrap();
                assert_eq!(exit.destination, m.to);
            }
        }
        assert!(ghosts.ghosts().all(|g| g.move_count > 0));
    }

    #[test]
    fn loss_stays_within_bounds() {
        let config = GhostsConfig::default();
        let (_, ghosts, mut rng) = setup(&config, 3);
        for gold in 1..200u32 {
            let lost = ghosts.resolve_loss(gold, &mut rng);
            let low = (f64::from(gold) * 0.10).floor() as u32;
            let high = (f64::from(gold) * 0.30).ceil() as u32;
            assert!(lost >= 1 && lost >= low && lost <= high.max(1), "gold {} lost {}", gold, lost);
        }
        assert_eq!(ghosts.resolve_loss(0, &mut rng), 0);
    }

    #[test]
    fn certain_encounter_with_empty_purse_costs_nothing() {
        let config = GhostsConfig {
            encounter_probability: 1.0,
            ..GhostsConfig::default()
        };
        let (_, ghosts, mut rng) = setup(&config, 4);
        let room = ghosts.ghosts().next().unwrap().current_room_id.clone();
        let encounter = ghosts.check_encounter(&room, 0, &mut rng).unwrap();
        assert_eq!(encounter.outcome, EncounterOutcome::NoLoss);
        assert_eq!(encounter.gold_lost(), 0);

        let encounter = ghosts.check_encounter(&room, 50, &mut rng).unwrap();
        match encounter.outcome {
            EncounterOutcome::GoldLost { lost, remaining } => {
                assert_eq!(lost + remaining, 50);
                assert!((5..=15).contains(&lost));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(ghosts.check_encounter("no_such_room", 10, &mut rng).is_none());
    }

    #[test]
    fn zero_probability_only_observes() {
        let config = GhostsConfig {
            encounter_probability: 0.0,
            ..GhostsConfig::default()
        };
        let (_, ghosts, mut rng) = setup(&config, 5);
        let room = ghosts.ghosts().next().unwrap().current_room_id.clone();
        let encounter = ghosts.check_encounter(&room, 100, &mut rng).unwrap();
        assert_eq!(encounter.outcome, EncounterOutcome::Observed);
        assert!(encounter.message().contains(&encounter.ghost_name));
    }
}
