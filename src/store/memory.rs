//! In-memory persistence for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::agent::{AgentRecord, AgentStatus};
use crate::error::StorageError;
use crate::frame::StackFrame;
use crate::message::Message;
use crate::store::{sort_by_depth, Persistence};
use crate::types::{AgentId, SessionId};

#[derive(Default)]
struct Tables {
    agents: HashMap<AgentId, AgentRecord>,
    frames: HashMap<AgentId, StackFrame>,
    messages: HashMap<AgentId, Vec<Message>>,
}

/// [`Persistence`] over plain maps, with the same row semantics as the sled store.
#[derive(Default)]
pub struct MemoryPersistence {
    tables: Mutex<Tables>,
    fail_frame_insert: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_frame` fail with [`StorageError::Unavailable`].
    pub fn fail_next_frame_insert(&self) {
        self.fail_frame_insert.store(true, Ordering::SeqCst);
    }

    pub fn agent_count(&self) -> usize {
        self.tables.lock().agents.len()
    }

    pub fn frame_count(&self) -> usize {
        self.tables.lock().frames.len()
    }

    pub fn message_count(&self) -> usize {
        self.tables.lock().messages.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn insert_agent(&self, agent: &AgentRecord) -> Result<(), StorageError> {
        let mut tables = self.tables.lock();
        if agent.is_main()
            && tables
                .agents
                .values()
                .any(|a| a.is_main() && a.session_id == agent.session_id)
        {
            return Err(StorageError::Conflict(format!(
                "Session {} already has a main agent",
                agent.session_id
            )));
        }
        tables.agents.insert(agent.id.clone(), agent.clone());
        Ok(())
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<AgentRecord>, StorageError> {
        Ok(self.tables.lock().agents.get(agent_id).cloned())
    }

    async fn update_agent_status(
        &self,
        agent_id: &AgentId,
        status: AgentStatus,
    ) -> Result<usize, StorageError> {
        match self.tables.lock().agents.get_mut(agent_id) {
            Some(agent) => {
                agent.status = status;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_children(&self, parent_id: &AgentId) -> Result<Vec<AgentRecord>, StorageError> {
        let mut children: Vec<AgentRecord> = self
            .tables
            .lock()
            .agents
            .values()
            .filter(|a| a.parent_id.as_ref() == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by_key(|a| a.created_at);
        Ok(children)
    }

    async fn list_session_agents(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<AgentRecord>, StorageError> {
        let mut agents: Vec<AgentRecord> = self
            .tables
            .lock()
            .agents
            .values()
            .filter(|a| &a.session_id == session_id)
            .cloned()
            .collect();
        sort_by_depth(&mut agents);
        Ok(agents)
    }

    async fn insert_frame(&self, frame: &StackFrame) -> Result<(), StorageError> {
        if self.fail_frame_insert.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!(
                "frame insert for agent {} rejected",
                frame.agent_id
            )));
        }
        self.tables
            .lock()
            .frames
            .insert(frame.agent_id.clone(), frame.clone());
        Ok(())
    }

    async fn get_latest_frame(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<StackFrame>, StorageError> {
        Ok(self.tables.lock().frames.get(agent_id).cloned())
    }

    async fn update_frame(&self, frame: &StackFrame) -> Result<usize, StorageError> {
        match self.tables.lock().frames.get_mut(&frame.agent_id) {
            Some(row) => {
                *row = frame.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StorageError> {
        self.tables
            .lock()
            .messages
            .entry(message.agent_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, agent_id: &AgentId) -> Result<Vec<Message>, StorageError> {
        Ok(self
            .tables
            .lock()
            .messages
            .get(agent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_messages_by_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError> {
        Ok(self
            .tables
            .lock()
            .messages
            .remove(agent_id)
            .map_or(0, |m| m.len()))
    }

    async fn delete_frame_by_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError> {
        Ok(usize::from(self.tables.lock().frames.remove(agent_id).is_some()))
    }

    async fn delete_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError> {
        Ok(usize::from(self.tables.lock().agents.remove(agent_id).is_some()))
    }
}
