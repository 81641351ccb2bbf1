//! Stack Frames
//!
//! Per-agent context containers. A frame owns its agent's current message
//! list and config, plus the inherited snapshot taken from the parent when the
//! frame was built. Frames refer to their parent by agent id only; the frame
//! cache resolves the id when a parent is needed.

pub mod inherit;

pub use inherit::{InheritanceMode, InheritedContext};

use crate::agent::AgentStatus;
use crate::error::EngineError;
use crate::message::{Message, Role};
use crate::metadata::Metadata;
use crate::types::{now, AgentId, FrameId, Timestamp};
use serde::{Deserialize, Serialize};

/// Mutable half of a frame: the agent's own messages and free-form config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentContext {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub config: Metadata,
}

/// Context frame bound 1:1 to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub frame_id: FrameId,
    pub agent_id: AgentId,
    pub parent_agent_id: Option<AgentId>,
    pub current: CurrentContext,
    inherited: InheritedContext,
    pub depth: u32,
    pub status: AgentStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Read projection of a frame, detached from the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullContext {
    pub frame_id: FrameId,
    pub agent_id: AgentId,
    pub parent_agent_id: Option<AgentId>,
    pub depth: u32,
    pub status: AgentStatus,
    pub current: CurrentContext,
    pub inherited: InheritedContext,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StackFrame {
    /// Depth-0 frame with an empty message list and nothing inherited.
    pub fn root(agent_id: AgentId, config: Metadata) -> Self {
        let created = now();
        Self {
            frame_id: FrameId::generate(),
            agent_id,
            parent_agent_id: None,
            current: CurrentContext {
                messages: Vec::new(),
                config,
            },
            inherited: InheritedContext::None,
            depth: 0,
            status: AgentStatus::Active,
            created_at: created,
            updated_at: created,
        }
    }

    /// Child frame one level below `parent`, seeded once from the parent's messages.
    ///
    /// Fails with [`EngineError::DepthExceeded`] when the child would sit deeper
    /// than `max_depth`.
    pub fn branch(
        agent_id: AgentId,
        parent: &StackFrame,
        mode: InheritanceMode,
        topic: &str,
        config: Metadata,
        max_depth: u32,
    ) -> Result<Self, EngineError> {
        let depth = parent.depth + 1;
        if depth > max_depth {
            return Err(EngineError::DepthExceeded {
                depth,
                max: max_depth,
            });
        }

        let inherited =
            InheritedContext::derive(&parent.agent_id, &parent.current.messages, mode, topic);
        let created = now();
        Ok(Self {
            frame_id: FrameId::generate(),
            agent_id,
            parent_agent_id: Some(parent.agent_id.clone()),
            current: CurrentContext {
                messages: Vec::new(),
                config,
            },
            inherited,
            depth,
            status: AgentStatus::Active,
            created_at: created,
            updated_at: created,
        })
    }

    pub fn inherited(&self) -> &InheritedContext {
        &self.inherited
    }

    /// Replace the inherited snapshot by re-deriving it from `parent` as it is now.
    pub fn rederive(&mut self, parent: &StackFrame, mode: InheritanceMode, topic: &str) {
        self.inherited =
            InheritedContext::derive(&parent.agent_id, &parent.current.messages, mode, topic);
        self.touch();
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    pub fn is_root(&self) -> bool {
        self.parent_agent_id.is_none()
    }

    /// Active -> Suspended. Suspending a suspended frame is a no-op.
    pub fn suspend(&mut self) -> Result<(), EngineError> {
        self.transition(AgentStatus::Suspended)
    }

    /// Suspended -> Active. Resuming an active frame only refreshes `updated_at`.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.transition(AgentStatus::Active)
    }

    /// Terminal. Completing twice is a no-op.
    pub fn complete(&mut self) {
        self.status = AgentStatus::Completed;
        self.touch();
    }

    fn transition(&mut self, to: AgentStatus) -> Result<(), EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "Frame for agent {} is completed and cannot become {}",
                self.agent_id, to
            )));
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Append a message to the current context and stamp the frame updated.
    pub fn add_message(&mut self, role: Role, content: &str, metadata: Metadata) -> Message {
        let message = Message::new(self.agent_id.clone(), role, content.to_string(), metadata);
        self.current.messages.push(message.clone());
        self.touch();
        message
    }

    pub fn messages(&self) -> &[Message] {
        &self.current.messages
    }

    pub fn full_context(&self) -> FullContext {
        FullContext {
            frame_id: self.frame_id.clone(),
            agent_id: self.agent_id.clone(),
            parent_agent_id: self.parent_agent_id.clone(),
            depth: self.depth,
            status: self.status,
            current: self.current.clone(),
            inherited: self.inherited.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn touch(&mut self) {
        self.updated_at = now();
    }
}
