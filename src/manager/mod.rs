//! Frame Manager
//!
//! Owns the frame cache, hierarchy index and switch history for one store.
//! Mutating operations are serialized by a single async gate so eviction and
//! branch creation never interleave. The in-memory state sits behind a
//! synchronous lock that is only taken between persistence calls, never across
//! one. Frame changes are applied to a copy, written through, and installed in
//! the cache once the store has accepted them.

pub mod cache;
pub mod hierarchy;
pub mod history;

pub use cache::FrameCache;
pub use hierarchy::{build_forest, HierarchyIndex, HierarchyNode};
pub use history::{SwitchHistory, SwitchRecord};

use crate::agent::{validate_topic, AgentRecord, AgentStatus};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::frame::{FullContext, InheritanceMode, StackFrame};
use crate::message::{validate_content, Message, Role};
use crate::metadata::{keys, Metadata};
use crate::store::Persistence;
use crate::types::{AgentId, MessageId, SessionId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct ManagerState {
    cache: FrameCache,
    hierarchy: HierarchyIndex,
    history: SwitchHistory,
}

/// Snapshot of the manager's in-memory footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_frames: usize,
    pub active_frames: usize,
    pub suspended_frames: usize,
    pub switch_history_count: usize,
    pub hierarchy_node_count: usize,
}

/// Stack-frame lifecycle manager
pub struct StackManager {
    store: Arc<dyn Persistence>,
    settings: EngineConfig,
    state: RwLock<ManagerState>,
    structure: tokio::sync::Mutex<()>,
}

impl StackManager {
    pub fn new(store: Arc<dyn Persistence>, settings: EngineConfig) -> Self {
        let state = ManagerState {
            cache: FrameCache::new(settings.max_active_frames),
            hierarchy: HierarchyIndex::new(),
            history: SwitchHistory::new(),
        };
        Self {
            store,
            settings,
            state: RwLock::new(state),
            structure: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn Persistence> {
        &self.store
    }

    /// Create the session's root agent and its depth-0 frame.
    pub async fn create_main(
        &self,
        session_id: &SessionId,
        topic: &str,
        config: Metadata,
    ) -> Result<AgentId, EngineError> {
        let _gate = self.structure.lock().await;
        validate_topic(topic)?;

        let existing = self.store.list_session_agents(session_id).await?;
        if existing.iter().any(AgentRecord::is_main) {
            return Err(EngineError::InvalidState(format!(
                "Session {} already has a main agent",
                session_id
            )));
        }

        let agent = AgentRecord::main(session_id.clone(), topic, config.clone())?;
        let frame = StackFrame::root(agent.id.clone(), config);
        self.persist_new(&agent, &frame).await?;

        self.state.write().cache.insert(frame);
        info!(
            agent_id = %agent.id,
            session_id = %session_id,
            topic = %agent.topic,
            "Created main agent"
        );
        Ok(agent.id)
    }

    /// Fork a branch below `parent_id`, seeded from the parent's messages.
    ///
    /// Depth is a hard limit. Capacity is advisory: when the active cap is
    /// reached the oldest active branch is suspended, and creation proceeds
    /// even if there was nothing to suspend. Eviction runs only once the new
    /// rows are stored, so a failed create never suspends anything.
    pub async fn create_branch(
        &self,
        parent_id: &AgentId,
        topic: &str,
        trigger_message: &MessageId,
        mode: InheritanceMode,
    ) -> Result<AgentId, EngineError> {
        let _gate = self.structure.lock().await;
        validate_topic(topic)?;

        let parent_frame = self.get_or_load(parent_id).await?;
        let max = self.settings.max_stack_depth;
        if parent_frame.depth >= max {
            return Err(EngineError::DepthExceeded {
                depth: parent_frame.depth + 1,
                max,
            });
        }

        let parent_row = self.store.get_agent(parent_id).await?.ok_or_else(|| {
            EngineError::InvalidState(format!("Parent agent {} has no agent row", parent_id))
        })?;

        let config = keys::branch_config(trigger_message, mode);
        let agent = AgentRecord::branch(&parent_row, topic, config.clone())?;
        let frame = StackFrame::branch(agent.id.clone(), &parent_frame, mode, topic, config, max)?;
        self.persist_new(&agent, &frame).await?;

        // The new frame is not cached yet, so it cannot be picked as the victim.
        if let Err(err) = self.make_room().await {
            self.discard_new(&agent.id).await;
            return Err(err);
        }

        {
            let mut state = self.state.write();
            state.cache.insert(frame);
            state.hierarchy.link(parent_id, &agent.id);
        }
        info!(
            agent_id = %agent.id,
            parent_id = %parent_id,
            depth = agent.depth,
            mode = %mode,
            "Created branch agent"
        );
        Ok(agent.id)
    }

    /// Suspend `from` (when given and cached) and activate `to`.
    ///
    /// Every call is logged, including redundant switches to an active agent.
    pub async fn switch(
        &self,
        from: Option<&AgentId>,
        to: &AgentId,
        reason: &str,
    ) -> Result<(), EngineError> {
        let _gate = self.structure.lock().await;
        let target = self.get_or_load(to).await?;
        if target.status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "Agent {} is completed and cannot be switched to",
                to
            )));
        }

        if let Some(from_id) = from {
            let source = self.state.read().cache.get(from_id).cloned();
            if let Some(mut source) = source.filter(|f| !f.status.is_terminal()) {
                source.suspend()?;
                self.commit_status(source).await?;
            }
        }

        // The source may have been the target itself.
        let mut target = self.state.read().cache.get(to).cloned().unwrap_or(target);
        target.resume()?;
        self.commit_status(target).await?;

        self.state
            .write()
            .history
            .push(from.cloned(), to.clone(), reason);
        info!(
            from = ?from.map(AgentId::as_str),
            to = %to,
            reason = reason,
            "Switched agent"
        );
        Ok(())
    }

    pub async fn suspend(&self, agent_id: &AgentId) -> Result<(), EngineError> {
        let _gate = self.structure.lock().await;
        let mut frame = self.get_or_load(agent_id).await?;
        frame.suspend()?;
        self.commit_status(frame).await?;
        info!(agent_id = %agent_id, "Suspended agent");
        Ok(())
    }

    /// Mark the agent completed. Completed agents cannot be resumed.
    pub async fn complete(&self, agent_id: &AgentId) -> Result<(), EngineError> {
        let _gate = self.structure.lock().await;
        let mut frame = self.get_or_load(agent_id).await?;
        frame.complete();
        self.commit_status(frame).await?;
        info!(agent_id = %agent_id, "Completed agent");
        Ok(())
    }

    pub async fn get_context(&self, agent_id: &AgentId) -> Result<FullContext, EngineError> {
        Ok(self.get_or_load(agent_id).await?.full_context())
    }

    /// Append a message to the agent's frame and the durable message store.
    pub async fn add_message(
        &self,
        agent_id: &AgentId,
        role: Role,
        content: &str,
        metadata: Metadata,
    ) -> Result<Message, EngineError> {
        validate_content(content)?;
        let _gate = self.structure.lock().await;

        let mut frame = self.get_or_load(agent_id).await?;
        if frame.status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "Agent {} is completed and no longer accepts messages",
                agent_id
            )));
        }
        let message = frame.add_message(role, content, metadata);

        self.store.insert_message(&message).await?;
        if self.store.update_frame(&frame).await? == 0 {
            warn!(agent_id = %agent_id, "Frame row missing while appending message");
        }
        self.state.write().cache.insert(frame);
        debug!(agent_id = %agent_id, role = %role, "Added message");
        Ok(message)
    }

    /// The agent's row.
    pub async fn agent(&self, agent_id: &AgentId) -> Result<AgentRecord, EngineError> {
        self.store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(agent_id.clone()))
    }

    /// Durable conversation, newest `limit` messages in order (`0` = all).
    pub async fn conversation(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> Result<Vec<Message>, EngineError> {
        let mut messages = self.store.list_messages(agent_id).await?;
        if limit > 0 && messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(messages)
    }

    /// Root forest of every agent in the session.
    pub async fn session_hierarchy(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<HierarchyNode>, EngineError> {
        let agents = self.store.list_session_agents(session_id).await?;
        Ok(build_forest(&agents))
    }

    /// Delete an agent with its messages and frame; `recursive` takes the
    /// whole subtree, children first. Returns the number of agents removed.
    pub async fn delete_branch(
        &self,
        agent_id: &AgentId,
        recursive: bool,
    ) -> Result<usize, EngineError> {
        let _gate = self.structure.lock().await;
        if self.store.get_agent(agent_id).await?.is_none() {
            return Err(EngineError::NotFound(agent_id.clone()));
        }

        let mut order = Vec::new();
        let mut stack = vec![(agent_id.clone(), false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            let children = self.store.list_children(&id).await?;
            if !recursive && !children.is_empty() {
                return Err(EngineError::InvalidState(format!(
                    "Agent {} has {} child agents; delete recursively",
                    id,
                    children.len()
                )));
            }
            stack.push((id, true));
            stack.extend(children.into_iter().rev().map(|c| (c.id, false)));
        }

        for id in &order {
            let messages = self.store.delete_messages_by_agent(id).await?;
            self.store.delete_frame_by_agent(id).await?;
            self.store.delete_agent(id).await?;
            {
                let mut state = self.state.write();
                state.cache.remove(id);
                state.hierarchy.remove_node(id);
            }
            debug!(agent_id = %id, messages, "Deleted agent");
        }

        info!(agent_id = %agent_id, removed = order.len(), "Deleted branch");
        Ok(order.len())
    }

    pub fn memory_stats(&self) -> MemoryStats {
        let state = self.state.read();
        MemoryStats {
            total_frames: state.cache.len(),
            active_frames: state.cache.active_count(),
            suspended_frames: state.cache.count_with_status(AgentStatus::Suspended),
            switch_history_count: state.history.len(),
            hierarchy_node_count: state.hierarchy.node_count(),
        }
    }

    /// Most recent `limit` switches, oldest first (`0` = all retained).
    pub fn switch_history(&self, limit: usize) -> Vec<SwitchRecord> {
        self.state.read().history.recent(limit)
    }

    /// Active frames in the cache, shallowest first.
    pub fn active_agents(&self) -> Vec<AgentId> {
        self.state.read().cache.active_ids()
    }

    /// Children of `agent_id` known to this manager instance.
    pub fn children(&self, agent_id: &AgentId) -> Vec<AgentId> {
        self.state.read().hierarchy.children(agent_id).to_vec()
    }

    /// Write agent and frame rows; a failed frame write removes the agent row again.
    async fn persist_new(&self, agent: &AgentRecord, frame: &StackFrame) -> Result<(), EngineError> {
        self.store.insert_agent(agent).await?;
        if let Err(err) = self.store.insert_frame(frame).await {
            warn!(
                agent_id = %agent.id,
                error = %err,
                "Frame insert failed; removing agent row"
            );
            if let Err(cleanup) = self.store.delete_agent(&agent.id).await {
                warn!(agent_id = %agent.id, error = %cleanup, "Compensating delete failed");
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Remove rows written by `persist_new` after a later step failed.
    async fn discard_new(&self, agent_id: &AgentId) {
        if let Err(cleanup) = self.store.delete_frame_by_agent(agent_id).await {
            warn!(agent_id = %agent_id, error = %cleanup, "Compensating frame delete failed");
        }
        if let Err(cleanup) = self.store.delete_agent(agent_id).await {
            warn!(agent_id = %agent_id, error = %cleanup, "Compensating delete failed");
        }
    }

    /// Suspend the oldest active branch when the active cap is reached.
    async fn make_room(&self) -> Result<(), EngineError> {
        let victim = {
            let state = self.state.read();
            match state.cache.check_capacity() {
                Ok(()) => return Ok(()),
                Err(EngineError::CapacityExhausted { active, capacity }) => {
                    debug!(active, capacity, "Active frame capacity reached");
                    state.cache.oldest_active_branch()
                }
                Err(other) => return Err(other),
            }
        };

        let Some(victim) = victim else {
            warn!("No active branch to evict; exceeding advisory capacity");
            return Ok(());
        };
        let frame = self.state.read().cache.get(&victim).cloned();
        if let Some(mut frame) = frame {
            frame.suspend()?;
            self.commit_status(frame).await?;
            info!(agent_id = %victim, "Evicted oldest active branch");
        }
        Ok(())
    }

    /// Persist a status change on `frame` and install it in the cache.
    async fn commit_status(&self, frame: StackFrame) -> Result<(), EngineError> {
        if self.store.update_frame(&frame).await? == 0 {
            warn!(agent_id = %frame.agent_id, "Frame row missing during status update");
        }
        if self
            .store
            .update_agent_status(&frame.agent_id, frame.status)
            .await?
            == 0
        {
            warn!(agent_id = %frame.agent_id, "Agent row missing during status update");
        }
        self.state.write().cache.insert(frame);
        Ok(())
    }

    /// Cached frame for `agent_id`, loading it and its ancestors on a miss.
    ///
    /// Walks up the parent chain until a cached ancestor (or the root) is
    /// reached, bounded by the depth limit, then admits the loaded frames
    /// ancestors first. Frames cached meanwhile by another caller are kept.
    async fn get_or_load(&self, agent_id: &AgentId) -> Result<StackFrame, EngineError> {
        if let Some(frame) = self.state.read().cache.get(agent_id) {
            debug!(agent_id = %agent_id, "Frame cache hit");
            return Ok(frame.clone());
        }

        let bound = self.settings.max_stack_depth as usize + 1;
        let mut chain: Vec<StackFrame> = Vec::new();
        let mut next = Some(agent_id.clone());
        while let Some(id) = next.take() {
            if chain.len() >= bound {
                warn!(agent_id = %id, bound, "Ancestor chain exceeds depth bound; stopping");
                break;
            }
            if self.state.read().cache.contains(&id) {
                break;
            }
            match self.store.get_latest_frame(&id).await? {
                Some(frame) => {
                    next = frame.parent_agent_id.clone();
                    chain.push(frame);
                }
                None if &id == agent_id => return Err(EngineError::NotFound(id)),
                None => {
                    warn!(agent_id = %id, "Ancestor frame missing from store");
                }
            }
        }

        let mut state = self.state.write();
        let loaded = chain.len();
        for frame in chain.into_iter().rev() {
            if let Some(parent) = frame.parent_agent_id.clone() {
                state.hierarchy.link(&parent, &frame.agent_id);
            }
            state.cache.admit_if_absent(frame);
        }
        debug!(agent_id = %agent_id, loaded, "Cold-loaded frame chain");
        state
            .cache
            .get(agent_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(agent_id.clone()))
    }
}
