//! Agent Store
//!
//! Durable rows for agents, frames and messages. The frame manager reads
//! through this interface on a cache miss and writes through on every
//! mutation. Each call is atomic on its own; callers must not assume
//! transactions spanning several calls.

pub mod memory;
pub mod persistence;

pub use memory::MemoryPersistence;
pub use persistence::SledPersistence;

use crate::agent::{AgentRecord, AgentStatus};
use crate::error::StorageError;
use crate::frame::StackFrame;
use crate::message::Message;
use crate::types::{AgentId, SessionId};
use async_trait::async_trait;

/// Persistence collaborator used by the frame manager.
///
/// Reads return `Ok(None)` / empty lists for missing rows. Updates and
/// deletes return the number of rows they touched.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Insert a new agent row. A second main agent in one session is a
    /// [`StorageError::Conflict`].
    async fn insert_agent(&self, agent: &AgentRecord) -> Result<(), StorageError>;

    async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<AgentRecord>, StorageError>;

    async fn update_agent_status(
        &self,
        agent_id: &AgentId,
        status: AgentStatus,
    ) -> Result<usize, StorageError>;

    /// Direct children of `parent_id`, oldest first.
    async fn list_children(&self, parent_id: &AgentId) -> Result<Vec<AgentRecord>, StorageError>;

    /// Every agent in the session, ordered by (depth, created_at).
    async fn list_session_agents(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<AgentRecord>, StorageError>;

    async fn insert_frame(&self, frame: &StackFrame) -> Result<(), StorageError>;

    /// The agent's current frame row, if one has been written.
    async fn get_latest_frame(&self, agent_id: &AgentId)
        -> Result<Option<StackFrame>, StorageError>;

    /// Replace the agent's frame row in place.
    async fn update_frame(&self, frame: &StackFrame) -> Result<usize, StorageError>;

    async fn insert_message(&self, message: &Message) -> Result<(), StorageError>;

    /// Messages owned by the agent in insertion order.
    async fn list_messages(&self, agent_id: &AgentId) -> Result<Vec<Message>, StorageError>;

    async fn delete_messages_by_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError>;

    async fn delete_frame_by_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError>;

    async fn delete_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError>;
}

/// Sort agent rows by (depth, created_at), the order hierarchy building expects.
pub(crate) fn sort_by_depth(agents: &mut [AgentRecord]) {
    agents.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
