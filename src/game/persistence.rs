//! Snapshot storage: `<data_dir>/world.json` and `<data_dir>/state.json`,
//! both written with an exclusive lock, a temp file and a rename.

use fs2::FileExt;
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::WorldError;
use crate::game::state::GameState;
use crate::world::definitions::parse_world;
use crate::world::types::WorldDefinition;

fn write_json_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot.json");
    // The live file is only ever replaced by rename; the lock lives beside it.
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(dir.join(format!(".{}.lock", base)))?;
    lock_file.lock_exclusive()?;
    let mut counter = 0u32;
    let tmp_path = loop {
        let cand = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&cand) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break cand;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => {
                return Err(e);
            }
        }
    };
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Ok(dirf) = File::open(dir) {
        let _ = dirf.sync_all();
    }
    let _ = FileExt::unlock(&lock_file);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StatePersistence {
    data_dir: PathBuf,
}

impl StatePersistence {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }

    pub fn world_path(&self) -> PathBuf {
        self.data_dir.join("world.json")
    }

    /// `Ok(None)` when nothing was saved yet; unreadable snapshots are fatal.
    pub fn load(&self) -> Result<Option<GameState>, WorldError> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }
        let state_err = |reason: String| WorldError::StateLoad {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(&path).map_err(|e| state_err(e.to_string()))?;
        let state: GameState =
            serde_json::from_str(&text).map_err(|e| state_err(e.to_string()))?;
        info!(
            target: "gloomhold::persistence",
            "loaded game state from {} ({} players, {} rooms)",
            path.display(),
            state.players.len(),
            state.room_states.len()
        );
        Ok(Some(state))
    }

    pub fn save(&self, state: &GameState) -> Result<(), WorldError> {
        let path = self.state_path();
        let write_err = |reason: String| WorldError::PersistenceWrite {
            path: path.display().to_string(),
            reason,
        };
        let json = serde_json::to_string_pretty(state).map_err(|e| write_err(e.to_string()))?;
        write_json_atomic(&path, &json).map_err(|e| write_err(e.to_string()))?;
        debug!(target: "gloomhold::persistence", "saved game state to {}", path.display());
        Ok(())
    }

    pub fn load_world(&self) -> Result<Option<WorldDefinition>, WorldError> {
        let path = self.world_path();
        if !path.exists() {
            return Ok(None);
        }
        let source_name = path.display().to_string();
        let text = std::fs::read_to_string(&path)
            .map_err(|e| WorldError::definition(source_name.as_str(), e))?;
        parse_world(&source_name, &text).map(Some)
    }

    pub fn save_world(&self, world: &WorldDefinition) -> Result<(), WorldError> {
        let path = self.world_path();
        let write_err = |reason: String| WorldError::PersistenceWrite {
            path: path.display().to_string(),
            reason,
        };
        let json = serde_json::to_string_pretty(world).map_err(|e| write_err(e.to_string()))?;
        write_json_atomic(&path, &json).map_err(|e| write_err(e.to_string()))?;
        info!(target: "gloomhold::persistence", "wrote world definition to {}", path.display());
        Ok(())
    }
}
