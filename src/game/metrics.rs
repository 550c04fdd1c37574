//! Per-world counters.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct WorldMetrics {
    commands: AtomicU64,
    command_failures: AtomicU64,
    locked_bounces: AtomicU64,
    unlocks: AtomicU64,
    encounters: AtomicU64,
    gold_lost: AtomicU64,
    coin_respawns: AtomicU64,
    ghost_moves: AtomicU64,
    autosave_ok: AtomicU64,
    autosave_failed: AtomicU64,
    characters_released: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub commands: u64,
    pub command_failures: u64,
    pub locked_bounces: u64,
    pub unlocks: u64,
    pub encounters: u64,
    pub gold_lost: u64,
    pub coin_respawns: u64,
    pub ghost_moves: u64,
    pub autosave_ok: u64,
    pub autosave_failed: u64,
    pub characters_released: u64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl WorldMetrics {
    pub fn inc_command(&self) {
        bump(&self.commands, 1);
    }
    pub fn inc_command_failure(&self) {
        bump(&self.command_failures, 1);
    }
    pub fn inc_locked_bounce(&self) {
        bump(&self.locked_bounces, 1);
    }
    pub fn inc_unlock(&self) {
        bump(&self.unlocks, 1);
    }
    pub fn record_encounter(&self, gold_lost: u32) {
        bump(&self.encounters, 1);
        bump(&self.gold_lost, u64::from(gold_lost));
    }
    pub fn inc_coin_respawn(&self) {
        bump(&self.coin_respawns, 1);
    }
    pub fn add_ghost_moves(&self, moves: usize) {
        bump(&self.ghost_moves, moves as u64);
    }
    pub fn inc_autosave_ok(&self) {
        bump(&self.autosave_ok, 1);
    }
    pub fn inc_autosave_failed(&self) {
        bump(&self.autosave_failed, 1);
    }
    pub fn inc_character_released(&self) {
        bump(&self.characters_released, 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            commands: read(&self.commands),
            command_failures: read(&self.command_failures),
            locked_bounces: read(&self.locked_bounces),
            unlocks: read(&self.unlocks),
            encounters: read(&self.encounters),
            gold_lost: read(&self.gold_lost),
            coin_respawns: read(&self.coin_respawns),
            ghost_moves: read(&self.ghost_moves),
            autosave_ok: read(&self.autosave_ok),
            autosave_failed: read(&self.autosave_failed),
            characters_released: read(&self.characters_released),
        }
    }
}
