//! Frame Cache
//!
//! Arena of live frames keyed by agent id. Parent links are ids, so removing
//! a subtree never leaves a dangling owner.

use crate::agent::AgentStatus;
use crate::error::EngineError;
use crate::frame::StackFrame;
use crate::types::AgentId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct CachedFrame {
    frame: StackFrame,
    /// Admission order; breaks creation-time ties during eviction.
    seq: u64,
}

/// Agent id -> frame, with an advisory cap on active frames.
#[derive(Debug)]
pub struct FrameCache {
    entries: HashMap<AgentId, CachedFrame>,
    capacity: usize,
    next_seq: u64,
}

impl FrameCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, agent_id: &AgentId) -> Option<&StackFrame> {
        self.entries.get(agent_id).map(|e| &e.frame)
    }

    pub fn get_mut(&mut self, agent_id: &AgentId) -> Option<&mut StackFrame> {
        self.entries.get_mut(agent_id).map(|e| &mut e.frame)
    }

    pub fn contains(&self, agent_id: &AgentId) -> bool {
        self.entries.contains_key(agent_id)
    }

    /// Insert or replace. A replaced frame keeps its admission order.
    pub fn insert(&mut self, frame: StackFrame) {
        let seq = match self.entries.get(&frame.agent_id) {
            Some(existing) => existing.seq,
            None => self.bump(),
        };
        self.entries
            .insert(frame.agent_id.clone(), CachedFrame { frame, seq });
    }

    /// Insert only when no frame is cached for the agent yet.
    ///
    /// Cold loads race with warm writers; the cached copy always wins because
    /// it may hold writes the loaded row has not seen. Returns whether the
    /// frame was admitted.
    pub fn admit_if_absent(&mut self, frame: StackFrame) -> bool {
        if self.entries.contains_key(&frame.agent_id) {
            return false;
        }
        self.insert(frame);
        true
    }

    pub fn remove(&mut self, agent_id: &AgentId) -> Option<StackFrame> {
        self.entries.remove(agent_id).map(|e| e.frame)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_with_status(&self, status: AgentStatus) -> usize {
        self.entries
            .values()
            .filter(|e| e.frame.status == status)
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.count_with_status(AgentStatus::Active)
    }

    /// Ids of active frames, shallowest and oldest first.
    pub fn active_ids(&self) -> Vec<AgentId> {
        let mut active: Vec<&CachedFrame> = self
            .entries
            .values()
            .filter(|e| e.frame.is_active())
            .collect();
        active.sort_by_key(|e| (e.frame.depth, e.frame.created_at, e.seq));
        active.into_iter().map(|e| e.frame.agent_id.clone()).collect()
    }

    /// `CapacityExhausted` once active frames reach the cap.
    pub fn check_capacity(&self) -> Result<(), EngineError> {
        let active = self.active_count();
        if active >= self.capacity {
            return Err(EngineError::CapacityExhausted {
                active,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Eviction victim: the earliest-created active frame below the root.
    pub fn oldest_active_branch(&self) -> Option<AgentId> {
        self.entries
            .values()
            .filter(|e| e.frame.depth > 0 && e.frame.is_active())
            .min_by_key(|e| (e.frame.created_at, e.seq))
            .map(|e| e.frame.agent_id.clone())
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
