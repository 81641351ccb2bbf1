//! Bounded switch log.

use crate::types::{now, AgentId, Timestamp};
use serde::{Deserialize, Serialize};

/// Entries kept before a trim is triggered.
pub const HISTORY_CAPACITY: usize = 100;
/// Entries retained by a trim.
pub const HISTORY_RETAIN: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub from: Option<AgentId>,
    pub to: AgentId,
    pub at: Timestamp,
    pub reason: String,
}

/// Append-only switch log; once it grows past [`HISTORY_CAPACITY`] only the
/// newest [`HISTORY_RETAIN`] entries survive.
#[derive(Debug, Default)]
pub struct SwitchHistory {
    entries: Vec<SwitchRecord>,
}

impl SwitchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, from: Option<AgentId>, to: AgentId, reason: &str) {
        self.entries.push(SwitchRecord {
            from,
            to,
            at: now(),
            reason: reason.to_string(),
        });
        if self.entries.len() > HISTORY_CAPACITY {
            let excess = self.entries.len() - HISTORY_RETAIN;
            self.entries.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The newest `limit` entries, oldest first; `0` returns everything.
    pub fn recent(&self, limit: usize) -> Vec<SwitchRecord> {
        let start = if limit == 0 {
            0
        } else {
            self.entries.len().saturating_sub(limit)
        };
        self.entries[start..].to_vec()
    }
}
