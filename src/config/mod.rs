//! # Configuration
//!
//! Every tunable of the world lives in one TOML file, split into sections:
//!
//! - [`WorldConfig`] - room count, seed and connectivity ratios
//! - [`GoldConfig`] - per-room gold distribution and respawn defaults
//! - [`ItemsConfig`] - item pool density
//! - [`LocksConfig`] - locked doors and key placement
//! - [`GhostsConfig`] - wandering ghosts and encounters
//! - [`SessionsConfig`] - idle/afk detection and character release
//! - [`PersistenceConfig`] - data directory, autosave and content sources
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ```rust,no_run
//! use gloomhold::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("gloomhold.toml").await?;
//!     let config = Config::load("gloomhold.toml").await?;
//!     println!("rooms: {}", config.world.room_count);
//!     Ok(())
//! }
//! ```
//!
//! Sections missing from the file fall back to their defaults, so a config
//! file only needs the values it changes.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::world::types::MAX_TIMER_SECS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub room_count: usize,
    /// Fixed seed for reproducible worlds; random when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Share of rooms that aim for a single exit.
    pub degree_one: f64,
    /// Share of rooms that aim for two exits.
    pub degree_two: f64,
    /// Share of rooms that aim for three or four exits.
    pub degree_high: f64,
    /// Chance that a generated room receives an interactive object.
    pub furnish_chance: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            room_count: 100,
            seed: None,
            degree_one: 0.10,
            degree_two: 0.80,
            degree_high: 0.10,
            furnish_chance: 0.35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldConfig {
    pub min: u32,
    pub mean: f64,
    pub stddev: f64,
    pub max: u32,
    /// Chance that a room's gold comes back after being collected.
    pub respawn_chance: f64,
    pub default_respawn_secs: u64,
}

impl Default for GoldConfig {
    fn default() -> Self {
        Self {
            min: 0,
            mean: 10.0,
            stddev: 5.0,
            max: 50,
            respawn_chance: 0.3,
            default_respawn_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemsConfig {
    /// One item is generated per this many rooms.
    pub items_per_room_ratio: f64,
}

impl Default for ItemsConfig {
    fn default() -> Self {
        Self {
            items_per_room_ratio: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocksConfig {
    pub min_locks: usize,
    pub max_locks: usize,
    /// Minimum grid distance between a lock and its key.
    pub min_key_distance: u32,
    /// Edge samples tried per lock before giving up on it.
    pub max_attempts: usize,
}

impl Default for LocksConfig {
    fn default() -> Self {
        Self {
            min_locks: 3,
            max_locks: 6,
            min_key_distance: 4,
            max_attempts: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostsConfig {
    pub min_ghosts: usize,
    pub max_ghosts: usize,
    pub move_interval_secs: u64,
    pub encounter_probability: f64,
    pub gold_loss_min_pct: f64,
    pub gold_loss_max_pct: f64,
}

impl Default for GhostsConfig {
    fn default() -> Self {
        Self {
            min_ghosts: 2,
            max_ghosts: 4,
            move_interval_secs: 60,
            encounter_probability: 0.3,
            gold_loss_min_pct: 10.0,
            gold_loss_max_pct: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Seconds without a command before a player is marked idle.
    pub idle_timeout_secs: u64,
    /// Further seconds of idleness before the player is marked afk.
    pub afk_timeout_secs: u64,
    /// Seconds a disconnected player keeps their character.
    pub character_release_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            afk_timeout_secs: 900,
            character_release_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub data_dir: String,
    pub autosave_secs: u64,
    /// Optional JSON character roster; built-in characters when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters_file: Option<String>,
    /// Optional JSON verb alias table; built-in aliases when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbs_file: Option<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            autosave_secs: 60,
            characters_file: None,
            verbs_file: None,
        }
    }
}

impl PersistenceConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn world_path(&self) -> PathBuf {
        self.data_path().join("world.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_path().join("state.json")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("gloomhold.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub gold: GoldConfig,
    #[serde(default)]
    pub items: ItemsConfig,
    #[serde(default)]
    pub locks: LocksConfig,
    #[serde(default)]
    pub ghosts: GhostsConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        bail!("{} must be between 0 and 1 (got {})", name, value);
    }
    Ok(())
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values the generators or timers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.world.room_count == 0 {
            bail!("world.room_count must be at least 1");
        }
        for (name, value) in [
            ("world.degree_one", self.world.degree_one),
            ("world.degree_two", self.world.degree_two),
            ("world.degree_high", self.world.degree_high),
            ("world.furnish_chance", self.world.furnish_chance),
            ("gold.respawn_chance", self.gold.respawn_chance),
            ("ghosts.encounter_probability", self.ghosts.encounter_probability),
        ] {
            check_fraction(name, value)?;
        }
        let degree_sum = self.world.degree_one + self.world.degree_two + self.world.degree_high;
        if (degree_sum - 1.0).abs() > 1e-6 {
            bail!(
                "world.degree_one + degree_two + degree_high must sum to 1 (got {})",
                degree_sum
            );
        }
        if self.gold.min > self.gold.max {
            bail!("gold.min ({}) exceeds gold.max ({})", self.gold.min, self.gold.max);
        }
        if self.gold.stddev < 0.0 || self.gold.stddev.is_nan() {
            bail!("gold.stddev must be non-negative");
        }
        if self.items.items_per_room_ratio <= 0.0 || self.items.items_per_room_ratio.is_nan() {
            bail!("items.items_per_room_ratio must be positive");
        }
        if self.locks.min_locks > self.locks.max_locks {
            bail!("locks.min_locks exceeds locks.max_locks");
        }
        if self.ghosts.min_ghosts > self.ghosts.max_ghosts {
            bail!("ghosts.min_ghosts exceeds ghosts.max_ghosts");
        }
        let loss = &self.ghosts;
        if !loss.gold_loss_min_pct.is_finite()
            || !loss.gold_loss_max_pct.is_finite()
            || loss.gold_loss_min_pct < 0.0
            || loss.gold_loss_max_pct > 100.0
            || loss.gold_loss_min_pct > loss.gold_loss_max_pct
        {
            bail!(
                "ghost gold loss range {}..{} must satisfy 0 <= min <= max <= 100",
                loss.gold_loss_min_pct,
                loss.gold_loss_max_pct
            );
        }
        for (name, secs) in [
            ("gold.default_respawn_secs", self.gold.default_respawn_secs),
            ("ghosts.move_interval_secs", self.ghosts.move_interval_secs),
            ("persistence.autosave_secs", self.persistence.autosave_secs),
            ("sessions.idle_timeout_secs", self.sessions.idle_timeout_secs),
            ("sessions.afk_timeout_secs", self.sessions.afk_timeout_secs),
        ] {
            if secs == 0 {
                bail!("{} must be greater than zero", name);
            }
        }
        for (name, secs) in [
            ("gold.default_respawn_secs", self.gold.default_respawn_secs),
            ("ghosts.move_interval_secs", self.ghosts.move_interval_secs),
            ("persistence.autosave_secs", self.persistence.autosave_secs),
            ("sessions.idle_timeout_secs", self.sessions.idle_timeout_secs),
            ("sessions.afk_timeout_secs", self.sessions.afk_timeout_secs),
            ("sessions.character_release_secs", self.sessions.character_release_secs),
        ] {
            if secs > MAX_TIMER_SECS {
                bail!("{} cannot exceed {} seconds (got {})", name, MAX_TIMER_SECS, secs);
            }
        }
        Ok(())
    }
}
