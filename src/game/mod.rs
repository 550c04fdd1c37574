//! Runtime simulation: state, timers, ghosts and the engine that mutates them.

pub mod clock;
pub mod coins;
pub mod commands;
pub mod engine;
pub mod events;
pub mod ghosts;
pub mod metrics;
pub mod minimap;
pub mod persistence;
pub mod scheduler;
pub mod server;
pub mod state;

pub use commands::PlayerCommand;
pub use engine::{EngineBuilder, EngineSettings, TickOutcome, WorldEngine};
pub use server::{bootstrap, WorldHandle, WorldRequest, WorldServer};
pub use state::GameState;
