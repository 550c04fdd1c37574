//! Discrete timer queue feeding the serialized dispatch loop.
//!
//! Every background schedule (coin respawn, ghost movement, autosave, idle
//! detection, character release) is a keyed deadline. The dispatcher sleeps
//! until [`TimerQueue::next_deadline`], then drains [`TimerQueue::pop_due`]
//! and handles each key as one tick. Re-scheduling a key replaces its
//! previous deadline; cancelled or replaced entries are skipped lazily.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// `now + delay`, saturating at the latest representable instant.
pub fn deadline_after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    CoinRespawn(String),
    GhostMovement,
    Autosave,
    IdleCheck(String),
    CharacterRelease(String),
}

/// Ordering: (deadline ASC, insertion ASC).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    at: DateTime<Utc>,
    seq: u64,
    key: TimerKey,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    /// Live entry per key: (sequence number, deadline).
    live: HashMap<TimerKey, (u64, DateTime<Utc>)>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key` for `at`, replacing any earlier deadline for the same key.
    pub fn schedule(&mut self, key: TimerKey, at: DateTime<Utc>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(key.clone(), (seq, at));
        self.heap.push(Reverse(Entry { at, seq, key }));
    }

    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        self.live.remove(key).is_some()
    }

    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.live.contains_key(key)
    }

    pub fn deadline(&self, key: &TimerKey) -> Option<DateTime<Utc>> {
        self.live.get(key).map(|(_, at)| *at)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn is_current(&self, entry: &Entry) -> bool {
        self.live.get(&entry.key).map(|(seq, _)| *seq) == Some(entry.seq)
    }

    /// Earliest live deadline; drops stale heads on the way.
    pub fn next_deadline(&mut self) -> Option<DateTime<Utc>> {
        while let Some(Reverse(head)) = self.heap.peek() {
            if self.is_current(head) {
                return Some(head.at);
            }
            self.heap.pop();
        }
        None
    }

    /// Remove and return every live key due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<TimerKey> {
        let mut due = Vec::new();
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.at > now {
                break;
            }
            let Some(Reverse(entry)) = self.heap.pop() else {
                break;
            };
            if self.is_current(&entry) {
                self.live.remove(&entry.key);
                due.push(entry.key);
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_order() {
        let t0 = Utc::now();
        let mut q = TimerQueue::new();
        q.schedule(TimerKey::Autosave, t0 + Duration::seconds(60));
        q.schedule(TimerKey::GhostMovement, t0 + Duration::seconds(30));
        q.schedule(TimerKey::CoinRespawn("room_1".into()), t0 + Duration::seconds(30));
        assert_eq!(q.next_deadline(), Some(t0 + Duration::seconds(30)));
        assert!(q.pop_due(t0).is_empty());
        assert_eq!(
            q.pop_due(t0 + Duration::seconds(45)),
            vec![
                TimerKey::GhostMovement,
                TimerKey::CoinRespawn("room_1".into())
            ]
        );
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn reschedule_and_cancel_skip_stale_entries() {
        let t0 = Utc::now();
        let mut q = TimerQueue::new();
        let idle = TimerKey::IdleCheck("s1".into());
        q.schedule(idle.clone(), t0 + Duration::seconds(10));
        q.schedule(idle.clone(), t0 + Duration::seconds(100));
        assert_eq!(q.deadline(&idle), Some(t0 + Duration::seconds(100)));
        assert_eq!(q.next_deadline(), Some(t0 + Duration::seconds(100)));
        assert!(q.pop_due(t0 + Duration::seconds(50)).is_empty());

        let release = TimerKey::CharacterRelease("s1".into());
        q.schedule(release.clone(), t0 + Duration::seconds(20));
        assert!(q.cancel(&release));
        assert!(!q.is_armed(&release));
        assert_eq!(q.pop_due(t0 + Duration::seconds(200)), vec![idle]);
        assert!(q.is_empty());
        assert_eq!(q.next_deadline(), None);
    }

    #[test]
    fn deadlines_saturate_instead_of_overflowing() {
        let t0 = Utc::now();
        assert_eq!(deadline_after(t0, Duration::seconds(5)), t0 + Duration::seconds(5));
        assert_eq!(deadline_after(t0, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
