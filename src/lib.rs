//! # Gloomhold - a procedurally generated multi-user dungeon
//!
//! Gloomhold builds a grid-based world once (rooms, gold, items, locked doors
//! and their keys) and then runs a single authoritative simulation over it:
//! players move, pick things up and talk, gold respawns on timers and ghosts
//! wander the halls relieving careless adventurers of their coins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gloomhold::config::Config;
//! use gloomhold::game::{bootstrap, WorldServer};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("gloomhold.toml").await?;
//!     let (engine, persistence) = bootstrap(&config)?;
//!     let (outbound, _deliveries) = mpsc::unbounded_channel();
//!     let (server, handle) = WorldServer::new(engine, Some(persistence), outbound);
//!     tokio::spawn(server.run());
//!
//!     let session = gloomhold::game::WorldHandle::new_session_id();
//!     handle.select_character(&session, "ada", "char_1").await?;
//!     println!("{}", handle.command(&session, "look").await?);
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - static data model and the generators (map, gold, items, locks)
//! - [`game`] - runtime state, timers, ghosts, the engine and its dispatcher
//! - [`config`] - TOML configuration and validation
//! - [`validation`] - username and chat text checks
//! - [`errors`] - the crate error type
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  WorldHandle    │ ← transports send requests
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  WorldServer    │ ← one task: requests and timer ticks, in order
//! │  + WorldEngine  │
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Persistence    │ ← world.json / state.json snapshots
//! └─────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod game;
pub mod logutil;
pub mod validation;
pub mod world;

pub use errors::WorldError;
