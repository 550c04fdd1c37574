//! Serialized dispatcher around the [`WorldEngine`].
//!
//! Every player request and every timer tick runs on one task, one at a time,
//! so the engine never sees concurrent mutation. Transports talk to it through
//! a cloneable [`WorldHandle`]; broadcast text leaves through the `outbound`
//! channel as one [`Delivery`] per recipient.

use anyhow::Context;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::errors::WorldError;
use crate::game::commands::PlayerCommand;
use crate::game::engine::WorldEngine;
use crate::game::events::{Delivery, Reply, WorldEvent};
use crate::game::metrics::MetricsSnapshot;
use crate::game::persistence::StatePersistence;
use crate::game::state::GameState;
use crate::world::definitions::{CharacterDefinition, CharacterRoster, VerbTable};
use crate::world::generate_world;

/// Longest the loop sleeps before looking at the timers again.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

type Respond<T> = oneshot::Sender<Result<T, WorldError>>;

pub enum WorldRequest {
    Login {
        username: String,
        reply: Respond<(String, Vec<CharacterDefinition>)>,
    },
    SelectCharacter {
        session_id: String,
        username: String,
        character_id: String,
        reply: Respond<String>,
    },
    Command {
        session_id: String,
        input: String,
        reply: Respond<String>,
    },
    Disconnect {
        session_id: String,
        reply: Respond<()>,
    },
    Reconnect {
        session_id: String,
        reply: Respond<String>,
    },
    Leave {
        session_id: String,
        reply: oneshot::Sender<()>,
    },
    Snapshot(oneshot::Sender<GameState>),
    Metrics(oneshot::Sender<MetricsSnapshot>),
    SaveNow(Respond<()>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Clone, Debug)]
pub struct WorldHandle {
    tx: mpsc::UnboundedSender<WorldRequest>,
}

impl WorldHandle {
    /// Fresh opaque session id for a new connection.
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    async fn call<T>(&self, build: impl FnOnce(Respond<T>) -> WorldRequest) -> Result<T, WorldError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(build(tx))
            .map_err(|_| WorldError::DispatcherClosed)?;
        rx.await.map_err(|_| WorldError::DispatcherClosed)?
    }

    pub async fn login(&self, username: &str) -> Result<(String, Vec<CharacterDefinition>), WorldError> {
        let username = username.to_string();
        self.call(|reply| WorldRequest::Login { username, reply }).await
    }

    pub async fn select_character(
        &self,
        session_id: &str,
        username: &str,
        character_id: &str,
    ) -> Result<String, WorldError> {
        let (session_id, username, character_id) =
            (session_id.to_string(), username.to_string(), character_id.to_string());
        self.call(|reply| WorldRequest::SelectCharacter {
            session_id,
            username,
            character_id,
            reply,
        })
        .await
    }

    pub async fn command(&self, session_id: &str, input: &str) -> Result<String, WorldError> {
        let (session_id, input) = (session_id.to_string(), input.to_string());
        self.call(|reply| WorldRequest::Command {
            session_id,
            input,
            reply,
        })
        .await
    }

    pub async fn disconnect(&self, session_id: &str) -> Result<(), WorldError> {
        let session_id = session_id.to_string();
        self.call(|reply| WorldRequest::Disconnect { session_id, reply }).await
    }

    pub async fn reconnect(&self, session_id: &str) -> Result<String, WorldError> {
        let session_id = session_id.to_string();
        self.call(|reply| WorldRequest::Reconnect { session_id, reply }).await
    }

    /// Explicit quit: the character is released immediately.
    pub async fn leave(&self, session_id: &str) -> Result<(), WorldError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(WorldRequest::Leave {
                session_id: session_id.to_string(),
                reply: tx,
            })
            .map_err(|_| WorldError::DispatcherClosed)?;
        rx.await.map_err(|_| WorldError::DispatcherClosed)
    }

    pub async fn snapshot(&self) -> Option<GameState> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(WorldRequest::Snapshot(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }

    pub async fn metrics(&self) -> Option<MetricsSnapshot> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(WorldRequest::Metrics(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }

    pub async fn save_now(&self) -> Result<(), WorldError> {
        self.call(WorldRequest::SaveNow).await
    }

    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(WorldRequest::Shutdown(tx));
        let _ = rx.await;
    }
}

pub struct WorldServer {
    engine: WorldEngine,
    persistence: Option<StatePersistence>,
    rx: mpsc::UnboundedReceiver<WorldRequest>,
    outbound: mpsc::UnboundedSender<Delivery>,
}

impl WorldServer {
    pub fn new(
        engine: WorldEngine,
        persistence: Option<StatePersistence>,
        outbound: mpsc::UnboundedSender<Delivery>,
    ) -> (Self, WorldHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                engine,
                persistence,
                rx,
                outbound,
            },
            WorldHandle { tx },
        )
    }

    pub fn engine(&self) -> &WorldEngine {
        &self.engine
    }

    /// Serve until shutdown is requested or every handle is dropped.
    pub async fn run(mut self) {
        info!("world dispatcher running");
        loop {
            let wait = self.time_to_next_timer();
            tokio::select! {
                request = self.rx.recv() => {
                    match request {
                        Some(WorldRequest::Shutdown(done)) => {
                            self.final_save();
                            let _ = done.send(());
                            break;
                        }
                        Some(request) => self.handle(request),
                        None => {
                            self.final_save();
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(wait) => {
                    let outcome = self.engine.tick();
                    self.deliver(&outcome.events);
                    if outcome.autosave_due {
                        self.autosave();
                    }
                }
            }
        }
        info!("world dispatcher stopped");
    }

    fn time_to_next_timer(&mut self) -> Duration {
        match self.engine.next_deadline() {
            Some(at) => (at - self.engine.now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(IDLE_WAIT),
            None => IDLE_WAIT,
        }
    }

    fn handle(&mut self, request: WorldRequest) {
        match request {
            WorldRequest::Login { username, reply } => {
                let _ = reply.send(self.engine.login(&username));
            }
            WorldRequest::SelectCharacter {
                session_id,
                username,
                character_id,
                reply,
            } => {
                let result = self.engine.add_player(&session_id, &username, &character_id);
                let _ = reply.send(self.settle(result));
            }
            WorldRequest::Command {
                session_id,
                input,
                reply,
            } => {
                let result = self.engine.execute(&session_id, PlayerCommand::parse(&input));
                let _ = reply.send(self.settle(result));
            }
            WorldRequest::Disconnect { session_id, reply } => {
                let result = self.engine.disconnect(&session_id);
                let _ = reply.send(self.settle(result).map(|_| ()));
            }
            WorldRequest::Reconnect { session_id, reply } => {
                let result = self.engine.reconnect(&session_id);
                let _ = reply.send(self.settle(result));
            }
            WorldRequest::Leave { session_id, reply } => {
                let events = self.engine.remove_player(&session_id);
                self.deliver(&events);
                let _ = reply.send(());
            }
            WorldRequest::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
            }
            WorldRequest::Metrics(reply) => {
                let _ = reply.send(self.engine.metrics().snapshot());
            }
            WorldRequest::SaveNow(reply) => {
                let _ = reply.send(self.save());
            }
            WorldRequest::Shutdown(_) => {}
        }
    }

    /// Broadcast a successful reply's events and hand back its message.
    fn settle(&mut self, result: Result<Reply, WorldError>) -> Result<String, WorldError> {
        let reply = result?;
        self.deliver(&reply.events);
        Ok(reply.message)
    }

    fn deliver(&self, events: &[WorldEvent]) {
        for event in events {
            for session_id in self.engine.recipients(&event.audience) {
                let delivery = Delivery {
                    session_id,
                    kind: event.kind,
                    text: event.text.clone(),
                };
                if self.outbound.send(delivery).is_err() {
                    debug!("outbound channel closed; dropping broadcast");
                    return;
                }
            }
        }
    }

    fn save(&mut self) -> Result<(), WorldError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let now = self.engine.now();
        let mut state = self.engine.snapshot();
        state.last_saved = Some(now);
        persistence.save(&state)?;
        self.engine.mark_saved(now);
        Ok(())
    }

    /// Scheduled save. A failure is counted and left for the next interval.
    fn autosave(&mut self) {
        let result = self.save();
        if let Err(e) = &result {
            error!(target: "gloomhold::persistence", "autosave failed: {}", e);
        }
        self.engine.record_autosave(result.is_ok());
    }

    fn final_save(&mut self) {
        if let Err(e) = self.save() {
            error!(target: "gloomhold::persistence", "final save failed: {}", e);
        }
    }
}

/// Load or generate the world, restore state, and build a ready engine.
pub fn bootstrap(config: &Config) -> anyhow::Result<(WorldEngine, StatePersistence)> {
    let persistence = StatePersistence::new(config.persistence.data_path());

    let world = match persistence.load_world()? {
        Some(world) => {
            info!("loaded world from {}", persistence.world_path().display());
            world
        }
        None => {
            let mut rng = match config.world.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let generated = generate_world(config, &mut rng);
            persistence
                .save_world(&generated.world)
                .context("writing freshly generated world")?;
            generated.world
        }
    };

    let state = persistence.load()?;
    if state.is_none() {
        warn!("no saved state in {}; starting fresh", persistence.data_dir().display());
    }

    let roster = match &config.persistence.characters_file {
        Some(path) => CharacterRoster::load(Path::new(path))?,
        None => CharacterRoster::default(),
    };
    let verbs = match &config.persistence.verbs_file {
        Some(path) => VerbTable::load(Path::new(path))?,
        None => VerbTable::default(),
    };

    let engine = WorldEngine::builder(world, config)
        .state(state)
        .roster(roster)
        .verbs(verbs)
        .build();
    Ok((engine, persistence))
}
