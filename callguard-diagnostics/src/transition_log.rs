//! Bounded history of track health transitions

use callguard_core::{TrackHealthState, TrackSide};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of transitions kept per session
pub const DEFAULT_CAPACITY: usize = 128;

/// One recorded state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Track the transition happened on
    pub side: TrackSide,
    /// Previous state
    pub from: TrackHealthState,
    /// New state
    pub to: TrackHealthState,
    /// What caused the change
    pub reason: String,
    /// Wall-clock time of the change
    pub at: DateTime<Utc>,
}

/// Ring buffer of recent transitions; the oldest entry is evicted when full
#[derive(Debug)]
pub struct TransitionLog {
    capacity: usize,
    records: Mutex<VecDeque<TransitionRecord>>,
}

impl TransitionLog {
    /// Create a log holding at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Record a transition
    pub fn record(
        &self,
        side: TrackSide,
        from: TrackHealthState,
        to: TrackHealthState,
        reason: impl Into<String>,
    ) {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(TransitionRecord {
            side,
            from,
            to,
            reason: reason.into(),
            at: Utc::now(),
        });
    }

    /// All retained records, oldest first
    pub fn entries(&self) -> Vec<TransitionRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Most recent record for a side
    pub fn last_for(&self, side: TrackSide) -> Option<TransitionRecord> {
        self.records
            .lock()
            .iter()
            .rev()
            .find(|record| record.side == side)
            .cloned()
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no transitions were recorded
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop all records
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Export retained records as a JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries())
    }
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
