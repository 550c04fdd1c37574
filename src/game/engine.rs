//! The authoritative mutator.
//!
//! `WorldEngine` owns the static map, the runtime [`GameState`], the ghost
//! population and every background timer. Player operations validate first
//! and mutate second, so a failed call leaves no trace. Timer work arrives
//! through [`WorldEngine::tick`]. The engine is not `Sync`-shared; the
//! dispatcher in `game::server` is its only caller at runtime.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::WorldError;
use crate::game::clock::{Clock, SystemClock};
use crate::game::coins::{self, Recovery};
use crate::game::events::{Audience, EventKind, Reply, WorldEvent};
use crate::game::ghosts::{EncounterOutcome, GhostManager};
use crate::game::metrics::WorldMetrics;
use crate::game::minimap::Minimap;
use crate::game::scheduler::{deadline_after, TimerKey, TimerQueue};
use crate::game::state::{CharacterLock, GameState, Inventory, PlayerSession, PlayerStatus};
use crate::logutil::escape_log;
use crate::validation::{sanitize_chat, validate_player_name, MAX_CHAT_CHARS};
use crate::world::content;
use crate::world::definitions::{CharacterDefinition, CharacterRoster, VerbTable};
use crate::world::types::{timer_duration, Direction, WorldDefinition};

const HELP_TEXT: &str = "\
Commands:
  n/s/e/w or go <direction>   walk through an exit
  look                        describe the room
  <verb> <object>             interact (open chest, pull lever, take key)
  collect / drop              pick up or drop gold
  inventory                   what you carry
  map                         show the nearby map
  say <text> / emote <text>   talk or act
  wave, bow, laugh...         social actions
  help                        this text";

/// Timer lengths, resolved once from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub ghost_interval: Duration,
    pub autosave_interval: Duration,
    pub idle_timeout: Duration,
    pub afk_timeout: Duration,
    pub character_release: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ghost_interval: timer_duration(config.ghosts.move_interval_secs),
            autosave_interval: timer_duration(config.persistence.autosave_secs),
            idle_timeout: timer_duration(config.sessions.idle_timeout_secs),
            afk_timeout: timer_duration(config.sessions.afk_timeout_secs),
            character_release: timer_duration(config.sessions.character_release_secs),
        }
    }
}

/// Result of one timer pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub events: Vec<WorldEvent>,
    pub autosave_due: bool,
}

pub struct EngineBuilder<'a> {
    config: &'a Config,
    world: WorldDefinition,
    state: Option<GameState>,
    roster: CharacterRoster,
    verbs: VerbTable,
    clock: Arc<dyn Clock>,
    rng: Option<StdRng>,
}

impl<'a> EngineBuilder<'a> {
    /// Resume from a saved state instead of a fresh one.
    pub fn state(mut self, state: Option<GameState>) -> Self {
        self.state = state;
        self
    }

    pub fn roster(mut self, roster: CharacterRoster) -> Self {
        self.roster = roster;
        self
    }

    pub fn verbs(mut self, verbs: VerbTable) -> Self {
        self.verbs = verbs;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn rng(mut self, rng: StdRng) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn build(self) -> WorldEngine {
        let mut rng = self.rng.unwrap_or_else(|| match self.config.world.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        });
        let world = Arc::new(self.world);
        let settings = EngineSettings::from_config(self.config);
        let now = self.clock.now();
        let metrics = Arc::new(WorldMetrics::default());

        let resumed = self.state.is_some();
        let mut state = match self.state {
            Some(mut state) => {
                state.reconcile(&world);
                state
            }
            None => GameState::new_for(&world),
        };

        let ghosts = GhostManager::spawn(&self.config.ghosts, &world, &state.ghost_locations, &mut rng);
        state.ghost_locations = ghosts.locations();

        let mut timers = TimerQueue::new();
        if !ghosts.is_empty() {
            timers.schedule(TimerKey::GhostMovement, deadline_after(now, settings.ghost_interval));
        }
        timers.schedule(TimerKey::Autosave, deadline_after(now, settings.autosave_interval));

        for room in world.rooms.values() {
            let Some(runtime) = state.room_states.get_mut(&room.id) else {
                continue;
            };
            match coins::recover(&room.coins, runtime, now) {
                Recovery::Respawned => {
                    metrics.inc_coin_respawn();
                    debug!(target: "gloomhold::coins", "{} respawned during recovery", room.id);
                }
                Recovery::Armed(at) => timers.schedule(TimerKey::CoinRespawn(room.id.clone()), at),
                Recovery::Nothing => {}
            }
        }

        // Restored sessions have no live connection until they reconnect.
        for player in state.players.values_mut() {
            if player.disconnected_at.is_none() {
                player.disconnected_at = Some(now);
            }
            timers.schedule(
                TimerKey::CharacterRelease(player.session_id.clone()),
                deadline_after(now, settings.character_release),
            );
        }

        let key_names = world
            .rooms
            .values()
            .flat_map(|r| r.items.iter())
            .filter(|i| i.unlocks.is_some())
            .map(|i| (i.id.clone(), i.name.clone()))
            .collect();

        info!(
            "world engine ready: {} rooms, {} ghosts, {} players restored ({})",
            world.room_count(),
            ghosts.len(),
            state.players.len(),
            if resumed { "resumed" } else { "fresh" }
        );

        WorldEngine {
            world,
            state,
            roster: self.roster,
            verbs: self.verbs,
            ghosts,
            timers,
            rng,
            clock: self.clock,
            settings,
            metrics,
            key_names,
        }
    }
}

pub struct WorldEngine {
    world: Arc<WorldDefinition>,
    state: GameState,
    roster: CharacterRoster,
    verbs: VerbTable,
    ghosts: GhostManager,
    timers: TimerQueue,
    rng: StdRng,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    metrics: Arc<WorldMetrics>,
    key_names: HashMap<String, String>,
}

impl WorldEngine {
    pub fn builder(world: WorldDefinition, config: &Config) -> EngineBuilder<'_> {
        EngineBuilder {
            config,
            world,
            state: None,
            roster: CharacterRoster::default(),
            verbs: VerbTable::default(),
            clock: Arc::new(SystemClock),
            rng: None,
        }
    }

    pub fn world(&self) -> &WorldDefinition {
        &self.world
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn ghosts(&self) -> &GhostManager {
        &self.ghosts
    }

    pub fn roster(&self) -> &CharacterRoster {
        &self.roster
    }

    pub fn metrics(&self) -> Arc<WorldMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    // ----- helpers -----

    fn live_session(&self, session_id: &str) -> Result<&PlayerSession, WorldError> {
        self.state
            .players
            .get(session_id)
            .filter(|p| p.is_connected())
            .ok_or_else(|| WorldError::UnknownSession(session_id.to_string()))
    }

    fn session_mut(&mut self, session_id: &str) -> Result<&mut PlayerSession, WorldError> {
        self.state
            .players
            .get_mut(session_id)
            .ok_or_else(|| WorldError::UnknownSession(session_id.to_string()))
    }

    fn display_name(&self, session: &PlayerSession) -> String {
        self.roster
            .get(&session.character_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| session.username.clone())
    }

    fn name_of(&self, session_id: &str) -> String {
        self.state
            .players
            .get(session_id)
            .map(|s| self.display_name(s))
            .unwrap_or_else(|| "Someone".to_string())
    }

    fn key_name(&self, key_id: &str) -> String {
        self.key_names
            .get(key_id)
            .cloned()
            .unwrap_or_else(|| key_id.replace('_', " "))
    }

    /// Record activity: refresh `last_action`, restore `active`, re-arm idle detection.
    fn touch(&mut self, session_id: &str) -> Option<WorldEvent> {
        let now = self.clock.now();
        let idle_at = deadline_after(now, self.settings.idle_timeout);
        let player = self.state.players.get_mut(session_id)?;
        player.last_action = now;
        let previous = std::mem::replace(&mut player.status, PlayerStatus::Active);
        let room = player.current_room_id.clone();
        self.timers
            .schedule(TimerKey::IdleCheck(session_id.to_string()), idle_at);
        if previous == PlayerStatus::Active {
            return None;
        }
        let name = self.name_of(session_id);
        Some(WorldEvent::to_room(
            &room,
            Some(session_id),
            EventKind::Status,
            format!("{} stirs and looks around.", name),
        ))
    }

    fn finish(&mut self, session_id: &str, mut reply: Reply) -> Reply {
        if let Some(event) = self.touch(session_id) {
            reply.events.push(event);
        }
        reply
    }

    /// Session ids that receive an event for `audience`.
    pub fn recipients(&self, audience: &Audience) -> Vec<String> {
        match audience {
            Audience::Room { room_id, exclude } => self
                .state
                .sessions_in_room(room_id)
                .filter(|p| p.is_connected())
                .filter(|p| exclude.as_deref() != Some(p.session_id.as_str()))
                .map(|p| p.session_id.clone())
                .collect(),
            Audience::Session { session_id } => self
                .state
                .players
                .get(session_id)
                .filter(|p| p.is_connected())
                .map(|p| vec![p.session_id.clone()])
                .unwrap_or_default(),
        }
    }

    // ----- sessions -----

    /// Characters not bound to any session.
    pub fn available_characters(&self) -> Vec<CharacterDefinition> {
        self.roster
            .iter()
            .filter(|c| !self.state.character_locks.contains_key(&c.id))
            .cloned()
            .collect()
    }

    /// Validate a username and offer the free characters.
    pub fn login(&self, username: &str) -> Result<(String, Vec<CharacterDefinition>), WorldError> {
        let username = validate_player_name(username)?;
        Ok((username, self.available_characters()))
    }

    pub fn add_player(
        &mut self,
        session_id: &str,
        username: &str,
        character_id: &str,
    ) -> Result<Reply, WorldError> {
        let username = validate_player_name(username)?;
        let character = self
            .roster
            .get(character_id)
            .ok_or_else(|| WorldError::UnknownCharacter(character_id.to_string()))?
            .clone();
        if self.state.players.contains_key(session_id) {
            return Err(WorldError::SessionInUse(session_id.to_string()));
        }
        if self.state.character_locks.contains_key(character_id) {
            return Err(WorldError::CharacterTaken(character.name));
        }

        let now = self.clock.now();
        let start = self.world.starting_room_id.clone();
        self.state.character_locks.insert(
            character.id.clone(),
            CharacterLock {
                session_id: session_id.to_string(),
                username: username.clone(),
                locked_at: now,
            },
        );
        self.state.players.insert(
            session_id.to_string(),
            PlayerSession {
                session_id: session_id.to_string(),
                username: username.clone(),
                character_id: character.id.clone(),
                current_room_id: start.clone(),
                inventory: Inventory::default(),
                status: PlayerStatus::Active,
                connected_at: now,
                last_action: now,
                disconnected_at: None,
            },
        );
        info!(
            "{} joined as {} ({})",
            escape_log(&username),
            character.id,
            session_id
        );

        let reply = Reply::new(format!(
            "You are {}. {}\n\n{}",
            character.name,
            character.description,
            self.describe_room(&start, Some(session_id))
        ))
        .with_event(WorldEvent::to_room(
            &start,
            Some(session_id),
            EventKind::Arrival,
            format!("{} materializes out of the gloom.", character.name),
        ));
        Ok(self.finish(session_id, reply))
    }

    /// Release the character and drop the session. Carried items return to the
    /// floor. Unknown sessions are ignored.
    pub fn remove_player(&mut self, session_id: &str) -> Vec<WorldEvent> {
        let Some(player) = self.state.players.remove(session_id) else {
            return Vec::new();
        };
        if self
            .state
            .character_locks
            .get(&player.character_id)
            .map(|l| l.session_id == session_id)
            .unwrap_or(false)
        {
            self.state.character_locks.remove(&player.character_id);
        }
        self.timers
            .cancel(&TimerKey::IdleCheck(session_id.to_string()));
        self.timers
            .cancel(&TimerKey::CharacterRelease(session_id.to_string()));

        if let Some(room) = self.state.room_states.get_mut(&player.current_room_id) {
            room.items.extend(player.inventory.items.iter().cloned());
        }
        info!(
            "{} left; {} released",
            escape_log(&player.username),
            player.character_id
        );
        vec![WorldEvent::to_room(
            &player.current_room_id,
            Some(session_id),
            EventKind::Departure,
            format!("{} fades away.", self.display_name(&player)),
        )]
    }

    /// Link lost: keep the character for `character_release` seconds.
    pub fn disconnect(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        let room = self.live_session(session_id)?.current_room_id.clone();
        let now = self.clock.now();
        let name = self.name_of(session_id);
        self.session_mut(session_id)?.disconnected_at = Some(now);
        self.timers
            .cancel(&TimerKey::IdleCheck(session_id.to_string()));
        self.timers.schedule(
            TimerKey::CharacterRelease(session_id.to_string()),
            deadline_after(now, self.settings.character_release),
        );
        debug!("{} disconnected; release armed", session_id);
        Ok(Reply::new("Connection lost.").with_event(WorldEvent::to_room(
            &room,
            Some(session_id),
            EventKind::Status,
            format!("{} flickers and grows faint.", name),
        )))
    }

    /// Resume a disconnected session before its character is released.
    pub fn reconnect(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        let player = self
            .state
            .players
            .get(session_id)
            .ok_or_else(|| WorldError::UnknownSession(session_id.to_string()))?;
        let room = player.current_room_id.clone();
        let name = self.display_name(player);
        self.session_mut(session_id)?.disconnected_at = None;
        self.timers
            .cancel(&TimerKey::CharacterRelease(session_id.to_string()));
        let reply = Reply::new(format!(
            "Welcome back, {}.\n\n{}",
            name,
            self.describe_room(&room, Some(session_id))
        ))
        .with_event(WorldEvent::to_room(
            &room,
            Some(session_id),
            EventKind::Status,
            format!("{} snaps back into focus.", name),
        ));
        Ok(self.finish(session_id, reply))
    }

    // ----- player operations -----

    pub fn move_player(&mut self, session_id: &str, direction: Direction) -> Result<Reply, WorldError> {
        let player = self.live_session(session_id)?;
        let from = player.current_room_id.clone();
        let room = self
            .world
            .room(&from)
            .ok_or_else(|| WorldError::UnknownSession(session_id.to_string()))?;
        let exit = room.exit(direction).ok_or(WorldError::NoExit(direction))?;
        let to = exit.destination.clone();

        let mut unlocked_with = None;
        if self.state.is_exit_locked(exit) {
            let key_id = exit.required_key().unwrap_or_default().to_string();
            if !player.inventory.has_item(&key_id) {
                self.metrics.inc_locked_bounce();
                return Err(WorldError::LockedPath {
                    direction,
                    key_name: self.key_name(&key_id),
                    key_id,
                });
            }
            unlocked_with = exit.lock_id().map(|lock| (lock.to_string(), key_id));
        }

        let name = self.display_name(player);
        let mut reply = Reply::default();
        let mut lines = Vec::new();
        if let Some((lock_id, key_id)) = unlocked_with {
            let key_name = self.key_name(&key_id);
            self.state.unlocked_locks.insert(lock_id.clone());
            self.metrics.inc_unlock();
            info!("{} opened {} with {}", session_id, lock_id, key_id);
            lines.push(format!("You unlock the {} door with the {}.", direction, key_name));
            reply.events.push(WorldEvent::to_room(
                &from,
                Some(session_id),
                EventKind::Unlock,
                format!("{} unlocks the {} door with the {}.", name, direction, key_name),
            ));
            reply.events.push(WorldEvent::to_room(
                &to,
                None,
                EventKind::Unlock,
                format!("The {} door clicks open.", direction.opposite()),
            ));
        }

        let now = self.clock.now();
        let player = self.session_mut(session_id)?;
        player.current_room_id = to.clone();
        player.last_action = now;
        let gold = player.inventory.gold;

        reply.events.push(WorldEvent::to_room(
            &from,
            Some(session_id),
            EventKind::Departure,
            format!("{} leaves {}.", name, direction),
        ));
        reply.events.push(WorldEvent::to_room(
            &to,
            Some(session_id),
            EventKind::Arrival,
            format!("{} arrives from the {}.", name, direction.opposite()),
        ));
        lines.push(self.describe_room(&to, Some(session_id)));

        if let Some(encounter) = self.ghosts.check_encounter(&to, gold, &mut self.rng) {
            if let EncounterOutcome::GoldLost { remaining, .. } = encounter.outcome {
                self.session_mut(session_id)?.inventory.gold = remaining;
            }
            if encounter.outcome != EncounterOutcome::Observed {
                self.metrics.record_encounter(encounter.gold_lost());
                debug!(
                    target: "gloomhold::ghosts",
                    "{} met {}: {:?}", session_id, encounter.ghost_id, encounter.outcome
                );
                reply.events.push(WorldEvent::to_room(
                    &to,
                    Some(session_id),
                    EventKind::Ghost,
                    format!("The {} swoops through {}!", encounter.ghost_name, name),
                ));
            }
            lines.push(encounter.message());
        }

        reply.message = lines.join("\n\n");
        Ok(self.finish(session_id, reply))
    }

    /// Apply `verb` to an object in the room, or pick up an item with a take verb.
    pub fn interact(&mut self, session_id: &str, verb: &str, target: &str) -> Result<Reply, WorldError> {
        let player = self.live_session(session_id)?;
        let room_id = player.current_room_id.clone();
        let name = self.display_name(player);
        let canonical = self.verbs.canonical(verb);
        let room = self
            .world
            .room(&room_id)
            .ok_or_else(|| WorldError::UnknownSession(session_id.to_string()))?;

        let Some(object) = room.objects.iter().find(|o| o.matches(target)) else {
            if self.verbs.is_take(&canonical) {
                return self.take_item(session_id, &room_id, &name, target);
            }
            return Err(WorldError::ObjectNotFound(target.trim().to_string()));
        };

        let state_name = self
            .state
            .room_states
            .get(&room_id)
            .and_then(|r| r.object_states.get(&object.id))
            .cloned()
            .unwrap_or_else(|| object.initial_state.clone());
        let effect = object
            .state(&state_name)
            .and_then(|s| s.interactions.get(&canonical))
            .cloned()
            .ok_or_else(|| WorldError::VerbNotApplicable {
                verb: canonical.clone(),
                object: object.name.clone(),
                state: state_name.clone(),
            })?;
        let object_id = object.id.clone();
        let object_name = object.name.clone();

        if let Some(next) = &effect.next_state {
            if let Some(runtime) = self.state.room_states.get_mut(&room_id) {
                runtime.object_states.insert(object_id.clone(), next.clone());
            }
        }
        let player = self.session_mut(session_id)?;
        if let Some(item) = &effect.grant_item {
            if !player.inventory.has_item(&item.id) {
                player.inventory.items.push(item.clone());
            }
        }
        player.inventory.gold = player.inventory.gold.saturating_add(effect.coins);

        debug!(
            "{} {} {} in {} -> {:?}",
            session_id, canonical, object_id, room_id, effect.next_state
        );
        let reply = Reply::new(effect.message.clone()).with_event(WorldEvent::to_room(
            &room_id,
            Some(session_id),
            EventKind::Interaction,
            format!(
                "{} {} the {}. {}",
                name,
                content::third_person(&canonical),
                object_name,
                effect.message
            ),
        ));
        Ok(self.finish(session_id, reply))
    }

    fn take_item(
        &mut self,
        session_id: &str,
        room_id: &str,
        name: &str,
        target: &str,
    ) -> Result<Reply, WorldError> {
        let runtime = self
            .state
            .room_states
            .get_mut(room_id)
            .ok_or_else(|| WorldError::ObjectNotFound(target.trim().to_string()))?;
        let index = runtime
            .items
            .iter()
            .position(|i| i.matches(target))
            .ok_or_else(|| WorldError::ObjectNotFound(target.trim().to_string()))?;
        let item = runtime.items.remove(index);
        let item_name = item.name.clone();
        self.session_mut(session_id)?.inventory.items.push(item);
        let reply = Reply::new(format!("You pick up the {}.", item_name)).with_event(
            WorldEvent::to_room(
                room_id,
                Some(session_id),
                EventKind::Interaction,
                format!("{} picks up the {}.", name, item_name),
            ),
        );
        Ok(self.finish(session_id, reply))
    }

    /// Move every coin on the floor into the purse in one step.
    pub fn collect_coins(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        let player = self.live_session(session_id)?;
        let room_id = player.current_room_id.clone();
        let name = self.display_name(player);
        let amount = self
            .state
            .room_states
            .get(&room_id)
            .map(|r| r.coins)
            .unwrap_or(0);
        if amount == 0 {
            return Err(WorldError::NothingToCollect);
        }
        let gold = player
            .inventory
            .gold
            .checked_add(amount)
            .ok_or(WorldError::NothingToCollect)?;

        let now = self.clock.now();
        let config = self
            .world
            .room(&room_id)
            .map(|r| r.coins)
            .unwrap_or_default();
        let mut deadline = None;
        if let Some(runtime) = self.state.room_states.get_mut(&room_id) {
            runtime.coins = 0;
            deadline = coins::on_collected(&config, runtime, now);
        }
        self.session_mut(session_id)?.inventory.gold = gold;
        if let Some(at) = deadline {
            self.timers.schedule(TimerKey::CoinRespawn(room_id.clone()), at);
            debug!(target: "gloomhold::coins", "{} pending until {}", room_id, at);
        }

        let reply = Reply::new(format!(
            "You collect {} gold. You now have {} gold.",
            amount, gold
        ))
        .with_event(WorldEvent::to_room(
            &room_id,
            Some(session_id),
            EventKind::Coins,
            format!("{} scoops up {} gold coins.", name, amount),
        ));
        Ok(self.finish(session_id, reply))
    }

    /// Empty the purse onto the floor.
    pub fn drop_coins(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        let player = self.live_session(session_id)?;
        let room_id = player.current_room_id.clone();
        let name = self.display_name(player);
        let amount = player.inventory.gold;
        if amount == 0 {
            return Err(WorldError::NothingToDrop);
        }
        let floor = self
            .state
            .room_states
            .get(&room_id)
            .map(|r| r.coins)
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(WorldError::NothingToDrop)?;

        if let Some(runtime) = self.state.room_states.get_mut(&room_id) {
            runtime.coins = floor;
        }
        self.session_mut(session_id)?.inventory.gold = 0;

        let reply = Reply::new(format!("You drop {} gold.", amount)).with_event(
            WorldEvent::to_room(
                &room_id,
                Some(session_id),
                EventKind::Coins,
                format!("{} drops {} gold coins.", name, amount),
            ),
        );
        Ok(self.finish(session_id, reply))
    }

    pub fn say(&mut self, session_id: &str, text: &str) -> Result<Reply, WorldError> {
        let player = self.live_session(session_id)?;
        let room_id = player.current_room_id.clone();
        let name = self.display_name(player);
        let text = sanitize_chat(text, MAX_CHAT_CHARS)
            .map_err(|e| WorldError::InvalidText(e.to_string()))?;
        debug!("{} says {}", session_id, escape_log(&text));
        let reply = Reply::new(format!("You say: \"{}\"", text)).with_event(WorldEvent::to_room(
            &room_id,
            Some(session_id),
            EventKind::Speech,
            format!("{} says: \"{}\"", name, text),
        ));
        Ok(self.finish(session_id, reply))
    }

    /// Free-form emote: "emote sits down" → "Ada sits down".
    pub fn perform_action(&mut self, session_id: &str, text: &str) -> Result<Reply, WorldError> {
        let player = self.live_session(session_id)?;
        let room_id = player.current_room_id.clone();
        let name = self.display_name(player);
        let text = sanitize_chat(text, MAX_CHAT_CHARS)
            .map_err(|e| WorldError::InvalidText(e.to_string()))?;
        let line = format!("{} {}", name, text);
        let reply = Reply::new(line.clone()).with_event(WorldEvent::to_room(
            &room_id,
            Some(session_id),
            EventKind::Emote,
            line,
        ));
        Ok(self.finish(session_id, reply))
    }

    /// Known social verb: "wave" → "Ada waves."
    pub fn social(&mut self, session_id: &str, verb: &str) -> Result<Reply, WorldError> {
        let verb = verb.trim().to_lowercase();
        if !content::is_social(&verb) {
            return Err(WorldError::InvalidText(format!(
                "'{}' is not something you can do",
                escape_log(&verb)
            )));
        }
        let player = self.live_session(session_id)?;
        let room_id = player.current_room_id.clone();
        let name = self.display_name(player);
        let reply = Reply::new(format!("You {}.", verb)).with_event(WorldEvent::to_room(
            &room_id,
            Some(session_id),
            EventKind::Emote,
            format!("{} {}.", name, content::third_person(&verb)),
        ));
        Ok(self.finish(session_id, reply))
    }

    // ----- views -----

    pub fn describe_room(&self, room_id: &str, viewer: Option<&str>) -> String {
        let Some(room) = self.world.room(room_id) else {
            return "You are nowhere.".to_string();
        };
        let runtime = self.state.room_states.get(room_id);
        let mut lines = vec![room.name.clone(), room.description.clone()];

        for object in &room.objects {
            let state = runtime
                .and_then(|r| r.object_states.get(&object.id))
                .unwrap_or(&object.initial_state);
            if let Some(s) = object.state(state) {
                lines.push(s.description.clone());
            }
        }
        if let Some(runtime) = runtime {
            if !runtime.items.is_empty() {
                let names: Vec<&str> = runtime.items.iter().map(|i| i.name.as_str()).collect();
                lines.push(format!("On the floor: {}.", names.join(", ")));
            }
            match runtime.coins {
                0 => {}
                1 => lines.push("A single gold coin lies here.".to_string()),
                n => lines.push(format!("{} gold coins lie here.", n)),
            }
        }

        let exits: Vec<String> = room
            .exits
            .iter()
            .map(|(dir, exit)| {
                if self.state.is_exit_locked(exit) {
                    format!("{} (locked)", dir)
                } else {
                    dir.to_string()
                }
            })
            .collect();
        if exits.is_empty() {
            lines.push("There are no exits.".to_string());
        } else {
            lines.push(format!("Exits: {}.", exits.join(", ")));
        }

        let others: Vec<String> = self
            .state
            .sessions_in_room(room_id)
            .filter(|p| p.is_connected() && Some(p.session_id.as_str()) != viewer)
            .map(|p| self.display_name(p))
            .collect();
        if !others.is_empty() {
            lines.push(format!("Also here: {}.", others.join(", ")));
        }
        for ghost in self.ghosts.ghosts_in_room(room_id) {
            lines.push(format!("The {} lingers here. {}", ghost.name, ghost.description));
        }
        lines.join("\n")
    }

    pub fn look(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        let room_id = self.live_session(session_id)?.current_room_id.clone();
        let reply = Reply::new(self.describe_room(&room_id, Some(session_id)));
        Ok(self.finish(session_id, reply))
    }

    pub fn inventory(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        let player = self.live_session(session_id)?;
        let mut text = format!("You carry {} gold.", player.inventory.gold);
        if player.inventory.items.is_empty() {
            text.push_str("\nYour pack is empty.");
        } else {
            for item in &player.inventory.items {
                text.push_str(&format!("\n  {} ({})", item.name, item.category.as_str()));
            }
        }
        Ok(self.finish(session_id, Reply::new(text)))
    }

    pub fn minimap(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        let room_id = self.live_session(session_id)?.current_room_id.clone();
        let map = Minimap::render(&self.world, &self.state, &room_id);
        let reply = Reply::new(format!("{}\n{}", map, Minimap::legend()));
        Ok(self.finish(session_id, reply))
    }

    /// Roster with each character's availability.
    pub fn characters(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        self.live_session(session_id)?;
        let lines: Vec<String> = self
            .roster
            .iter()
            .map(|c| {
                let taken = match self.state.character_locks.get(&c.id) {
                    Some(lock) => format!(" (played by {})", lock.username),
                    None => String::new(),
                };
                format!("  {}: {}{}", c.id, c.name, taken)
            })
            .collect();
        let reply = Reply::new(format!("Characters:\n{}", lines.join("\n")));
        Ok(self.finish(session_id, reply))
    }

    pub fn help(&mut self, session_id: &str) -> Result<Reply, WorldError> {
        self.live_session(session_id)?;
        Ok(self.finish(session_id, Reply::new(HELP_TEXT)))
    }

    // ----- timers -----

    pub fn next_deadline(&mut self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Run every timer that is due, one at a time, in deadline order.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now();
        let mut outcome = TickOutcome::default();
        for key in self.timers.pop_due(now) {
            match key {
                TimerKey::CoinRespawn(room_id) => self.respawn_coins(&room_id, &mut outcome),
                TimerKey::GhostMovement => {
                    self.move_ghosts(&mut outcome);
                    self.timers.schedule(
                        TimerKey::GhostMovement,
                        deadline_after(now, self.settings.ghost_interval),
                    );
                }
                TimerKey::Autosave => {
                    outcome.autosave_due = true;
                    self.timers.schedule(
                        TimerKey::Autosave,
                        deadline_after(now, self.settings.autosave_interval),
                    );
                }
                TimerKey::IdleCheck(session_id) => self.check_idle(&session_id, now, &mut outcome),
                TimerKey::CharacterRelease(session_id) => {
                    if self
                        .state
                        .players
                        .get(&session_id)
                        .map(|p| !p.is_connected())
                        .unwrap_or(false)
                    {
                        info!("releasing character held by {}", session_id);
                        self.metrics.inc_character_released();
                        outcome.events.extend(self.remove_player(&session_id));
                    }
                }
            }
        }
        outcome
    }

    fn respawn_coins(&mut self, room_id: &str, outcome: &mut TickOutcome) {
        let Some(config) = self.world.room(room_id).map(|r| r.coins) else {
            return;
        };
        let Some(runtime) = self.state.room_states.get_mut(room_id) else {
            return;
        };
        if coins::respawn(&config, runtime) {
            self.metrics.inc_coin_respawn();
            debug!(target: "gloomhold::coins", "{} respawned {} coins", room_id, runtime.coins);
            outcome.events.push(WorldEvent::to_room(
                room_id,
                None,
                EventKind::Coins,
                "Gold coins glint into being on the floor.".to_string(),
            ));
        }
    }

    fn move_ghosts(&mut self, outcome: &mut TickOutcome) {
        let moves = self.ghosts.move_all(&self.world, &self.state, &mut self.rng);
        self.metrics.add_ghost_moves(moves.len());
        self.state.ghost_locations = self.ghosts.locations();
        for m in moves {
            outcome.events.push(WorldEvent::to_room(
                &m.from,
                None,
                EventKind::Ghost,
                format!("The {} drifts away to the {}.", m.ghost_name, m.direction),
            ));
            outcome.events.push(WorldEvent::to_room(
                &m.to,
                None,
                EventKind::Ghost,
                format!(
                    "The {} drifts in from the {}.",
                    m.ghost_name,
                    m.direction.opposite()
                ),
            ));
        }
    }

    fn check_idle(&mut self, session_id: &str, now: DateTime<Utc>, outcome: &mut TickOutcome) {
        let afk_at = deadline_after(now, self.settings.afk_timeout);
        let Some(player) = self.state.players.get_mut(session_id) else {
            return;
        };
        if !player.is_connected() {
            return;
        }
        let next = match player.status {
            PlayerStatus::Active => PlayerStatus::Idle,
            PlayerStatus::Idle => PlayerStatus::Afk,
            PlayerStatus::Afk => return,
        };
        player.status = next;
        let room = player.current_room_id.clone();
        if next == PlayerStatus::Idle {
            self.timers
                .schedule(TimerKey::IdleCheck(session_id.to_string()), afk_at);
        }
        let name = self.name_of(session_id);
        debug!("{} is now {}", session_id, next.as_str());
        outcome.events.push(WorldEvent::to_room(
            &room,
            Some(session_id),
            EventKind::Status,
            format!("{} is now {}.", name, next.as_str()),
        ));
    }

    // ----- persistence hooks -----

    /// Clone of the aggregate for saving.
    pub fn snapshot(&self) -> GameState {
        let mut state = self.state.clone();
        state.ghost_locations = self.ghosts.locations();
        state
    }

    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.state.last_saved = Some(at);
    }

    pub fn record_autosave(&self, ok: bool) {
        if ok {
            self.metrics.inc_autosave_ok();
        } else {
            self.metrics.inc_autosave_failed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::clock::ManualClock;
    use crate::world::types::{CoinConfig, Exit, Item, Room};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    /// room_0 (brass key) ─north→ room_1 (5 gold, respawning) ─east, locked→ room_2
    fn world() -> WorldDefinition {
        let rooms = vec![
            Room::new("room_0", "Gatehouse", "Cold stone.")
                .at(0, 0)
                .with_exit(Direction::North, Exit::open("room_1"))
                .with_item(Item::key("brass_key", "brass key", "lock_1"))
                .with_object(content::object_templates("0").remove(0)),
            Room::new("room_1", "Hall", "Dusty.")
                .at(0, -1)
                .with_exit(Direction::South, Exit::open("room_0"))
                .with_exit(Direction::East, Exit::locked("room_2", "lock_1", "brass_key"))
                .with_coins(CoinConfig::respawning(5, 300)),
            Room::new("room_2", "Vault", "Quiet.")
                .at(1, -1)
                .with_exit(Direction::West, Exit::locked("room_1", "lock_1", "brass_key")),
        ];
        WorldDefinition {
            rooms: rooms.into_iter().map(|r| (r.id.clone(), r)).collect::<BTreeMap<_, _>>(),
            starting_room_id: "room_0".into(),
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.ghosts.min_ghosts = 0;
        config.ghosts.max_ghosts = 0;
        config
    }

    fn engine() -> (WorldEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
        let engine = WorldEngine::builder(world(), &config())
            .clock(clock.clone())
            .rng(StdRng::seed_from_u64(9))
            .build();
        (engine, clock)
    }

    #[test]
    fn join_collect_and_respawn() {
        let (mut engine, clock) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        assert_eq!(engine.state().players["s1"].current_room_id, "room_0");

        engine.move_player("s1", Direction::North).unwrap();
        let reply = engine.collect_coins("s1").unwrap();
        assert!(reply.message.contains("5 gold"));
        assert_eq!(engine.state().players["s1"].inventory.gold, 5);
        assert_eq!(engine.state().room_states["room_1"].coins, 0);
        assert!(matches!(engine.collect_coins("s1"), Err(WorldError::NothingToCollect)));

        clock.advance(Duration::seconds(299));
        engine.tick();
        assert_eq!(engine.state().room_states["room_1"].coins, 0);
        clock.advance(Duration::seconds(1));
        let outcome = engine.tick();
        assert_eq!(engine.state().room_states["room_1"].coins, 5);
        assert!(outcome.events.iter().any(|e| e.kind == EventKind::Coins));
        assert_eq!(engine.state().gold_in_circulation(), 10);
    }

    #[test]
    fn locked_door_needs_the_key() {
        let (mut engine, _) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        engine.move_player("s1", Direction::North).unwrap();
        match engine.move_player("s1", Direction::East) {
            Err(WorldError::LockedPath { key_name, .. }) => assert_eq!(key_name, "brass key"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(engine.state().players["s1"].current_room_id, "room_1");

        engine.move_player("s1", Direction::South).unwrap();
        engine.interact("s1", "grab", "brass key").unwrap();
        engine.move_player("s1", Direction::North).unwrap();
        let reply = engine.move_player("s1", Direction::East).unwrap();
        assert!(reply.message.contains("unlock"));
        assert!(engine.state().unlocked_locks.contains("lock_1"));
        // the mirror side opens with the same lock id
        engine.move_player("s1", Direction::West).unwrap();
        assert_eq!(engine.metrics().snapshot().unlocks, 1);
    }

    #[test]
    fn character_binding_rules() {
        let (mut engine, _) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        assert!(matches!(
            engine.add_player("s2", "bob", "char_1"),
            Err(WorldError::CharacterTaken(_))
        ));
        assert!(matches!(
            engine.add_player("s1", "bob", "char_2"),
            Err(WorldError::SessionInUse(_))
        ));
        assert!(matches!(
            engine.add_player("s3", "bob", "char_99"),
            Err(WorldError::UnknownCharacter(_))
        ));
        assert!(engine.add_player("s3", "x", "char_2").is_err());
        assert!(!engine.available_characters().iter().any(|c| c.id == "char_1"));
        assert!(matches!(
            engine.move_player("s2", Direction::North),
            Err(WorldError::UnknownSession(_))
        ));
        assert!(matches!(
            engine.move_player("s1", Direction::West),
            Err(WorldError::NoExit(Direction::West))
        ));
    }

    #[test]
    fn removal_returns_items_and_frees_character() {
        let (mut engine, _) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        engine.interact("s1", "take", "brass_key").unwrap();
        assert!(engine.state().room_states["room_0"].items.is_empty());
        let events = engine.remove_player("s1");
        assert_eq!(events.len(), 1);
        assert_eq!(engine.state().room_states["room_0"].items.len(), 1);
        assert!(engine.available_characters().iter().any(|c| c.id == "char_1"));
        assert!(engine.remove_player("s1").is_empty());
    }

    #[test]
    fn objects_change_state_and_pay_out() {
        let (mut engine, _) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        let reply = engine.interact("s1", "open", "chest").unwrap();
        assert_eq!(reply.events.len(), 1);
        assert_eq!(engine.state().players["s1"].inventory.gold, 3);
        assert_eq!(engine.state().room_states["room_0"].object_states["chest"], "open");
        match engine.interact("s1", "open", "chest") {
            Err(WorldError::VerbNotApplicable { state, .. }) => assert_eq!(state, "open"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            engine.interact("s1", "open", "wardrobe"),
            Err(WorldError::ObjectNotFound(_))
        ));
        assert_eq!(engine.state().players["s1"].inventory.gold, 3);
    }

    #[test]
    fn drop_moves_whole_purse_to_floor() {
        let (mut engine, _) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        assert!(matches!(engine.drop_coins("s1"), Err(WorldError::NothingToDrop)));
        engine.interact("s1", "open", "chest").unwrap();
        engine.drop_coins("s1").unwrap();
        assert_eq!(engine.state().players["s1"].inventory.gold, 0);
        assert_eq!(engine.state().room_states["room_0"].coins, 3);
    }

    #[test]
    fn idle_then_afk_then_active_again() {
        let (mut engine, clock) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        engine.add_player("s2", "bob", "char_2").unwrap();
        clock.advance(Duration::seconds(300));
        let outcome = engine.tick();
        assert_eq!(engine.state().players["s1"].status, PlayerStatus::Idle);
        assert!(outcome.events.iter().any(|e| e.text.contains("idle")));
        clock.advance(Duration::seconds(900));
        engine.tick();
        assert_eq!(engine.state().players["s1"].status, PlayerStatus::Afk);

        let reply = engine.look("s1").unwrap();
        assert_eq!(engine.state().players["s1"].status, PlayerStatus::Active);
        assert!(reply.events.iter().any(|e| e.kind == EventKind::Status));
    }

    #[test]
    fn disconnected_characters_release_after_grace() {
        let (mut engine, clock) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        engine.disconnect("s1").unwrap();
        assert!(matches!(engine.look("s1"), Err(WorldError::UnknownSession(_))));

        clock.advance(Duration::seconds(60));
        engine.tick();
        engine.reconnect("s1").unwrap();
        engine.look("s1").unwrap();

        engine.disconnect("s1").unwrap();
        clock.advance(Duration::seconds(120));
        engine.tick();
        assert!(engine.state().players.is_empty());
        assert!(engine.state().character_locks.is_empty());
        assert_eq!(engine.metrics().snapshot().characters_released, 1);
    }

    #[test]
    fn broadcasts_skip_actor_and_other_rooms() {
        let (mut engine, _) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        engine.add_player("s2", "bob", "char_2").unwrap();
        let reply = engine.say("s1", "hello there").unwrap();
        assert_eq!(engine.recipients(&reply.events[0].audience), vec!["s2".to_string()]);
        assert!(matches!(engine.say("s1", "   "), Err(WorldError::InvalidText(_))));

        let reply = engine.move_player("s2", Direction::North).unwrap();
        let arrival = reply
            .events
            .iter()
            .find(|e| e.kind == EventKind::Arrival)
            .unwrap();
        assert!(engine.recipients(&arrival.audience).is_empty());
        let reply = engine.social("s1", "wave").unwrap();
        assert!(reply.events[0].text.ends_with("waves."));
        assert!(engine.social("s1", "wave hard").is_err());
        assert!(matches!(engine.social("s1", "xyzzy"), Err(WorldError::InvalidText(_))));
        assert!(engine.social("s1", "Dance").is_ok());
    }

    #[test]
    fn autosave_comes_due_each_interval() {
        let (mut engine, clock) = engine();
        let start = engine.now();
        let interval = Duration::seconds(config().persistence.autosave_secs as i64);
        assert_eq!(engine.timers().deadline(&TimerKey::Autosave), Some(start + interval));

        clock.advance(interval - Duration::seconds(1));
        assert!(!engine.tick().autosave_due);
        clock.advance(Duration::seconds(1));
        assert!(engine.tick().autosave_due);
        assert_eq!(
            engine.timers().deadline(&TimerKey::Autosave),
            Some(start + interval + interval)
        );
        // a failed write is only counted; the next attempt stays on schedule
        engine.record_autosave(false);
        assert!(!engine.tick().autosave_due);
        assert_eq!(engine.metrics().snapshot().autosave_failed, 1);
        assert_eq!(
            engine.timers().deadline(&TimerKey::Autosave),
            Some(start + interval + interval)
        );
    }

    #[test]
    fn huge_timer_lengths_saturate() {
        let mut config = config();
        config.persistence.autosave_secs = u64::MAX;
        config.sessions.character_release_secs = u64::MAX;
        config.sessions.idle_timeout_secs = u64::MAX;
        let mut world = world();
        world.rooms.get_mut("room_1").unwrap().coins =
            CoinConfig::respawning(5, 10_000_000_000_000_000);

        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
        let mut engine = WorldEngine::builder(world, &config)
            .clock(clock.clone())
            .rng(StdRng::seed_from_u64(9))
            .build();
        engine.add_player("s1", "ada", "char_1").unwrap();
        engine.move_player("s1", Direction::North).unwrap();
        engine.collect_coins("s1").unwrap();
        engine.disconnect("s1").unwrap();

        clock.advance(Duration::days(365));
        let outcome = engine.tick();
        assert!(!outcome.autosave_due);
        assert_eq!(engine.state().room_states["room_1"].coins, 0);
        assert_eq!(engine.state().players.len(), 1);
    }

    #[test]
    fn resumed_state_is_reconciled_and_sessions_held() {
        let (mut engine, clock) = engine();
        engine.add_player("s1", "ada", "char_1").unwrap();
        engine.move_player("s1", Direction::North).unwrap();
        engine.collect_coins("s1").unwrap();
        let saved = engine.snapshot();

        clock.advance(Duration::seconds(400));
        let mut resumed = WorldEngine::builder(world(), &config())
            .state(Some(saved))
            .clock(clock.clone())
            .rng(StdRng::seed_from_u64(1))
            .build();
        // overdue respawn applied during recovery
        assert_eq!(resumed.state().room_states["room_1"].coins, 5);
        assert!(!resumed.state().players["s1"].is_connected());
        resumed.reconnect("s1").unwrap();
        assert_eq!(resumed.state().players["s1"].inventory.gold, 5);
    }
}
