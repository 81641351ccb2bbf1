//! Agent Records
//!
//! Durable identity of a conversational agent: which session owns it, where it
//! sits in the branch tree, what topic it explores and its lifecycle status.
//! Each agent is bound 1:1 to a stack frame whose status mirrors the agent's.

use crate::error::EngineError;
use crate::metadata::Metadata;
use crate::types::{now, AgentId, SessionId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on topic length, in characters.
pub const MAX_TOPIC_LEN: usize = 255;

/// Position of an agent in its session tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Depth-0 root; exactly one per session
    Main,
    /// Forked from an ancestor's history
    Branch,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Main => "main",
            AgentKind::Branch => "branch",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status shared by an agent and its frame.
///
/// `Active <-> Suspended`, and either may move to `Completed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Suspended,
    Completed,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Suspended => "suspended",
            AgentStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Completed)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted agent row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub session_id: SessionId,
    pub parent_id: Option<AgentId>,
    pub kind: AgentKind,
    pub topic: String,
    #[serde(default)]
    pub config: Metadata,
    pub depth: u32,
    pub status: AgentStatus,
    pub created_at: Timestamp,
}

impl AgentRecord {
    /// Root agent for a session.
    pub fn main(session_id: SessionId, topic: &str, config: Metadata) -> Result<Self, EngineError> {
        validate_topic(topic)?;
        Ok(Self {
            id: AgentId::generate(),
            session_id,
            parent_id: None,
            kind: AgentKind::Main,
            topic: topic.trim().to_string(),
            config,
            depth: 0,
            status: AgentStatus::Active,
            created_at: now(),
        })
    }

    /// Branch agent one level below `parent`.
    pub fn branch(parent: &AgentRecord, topic: &str, config: Metadata) -> Result<Self, EngineError> {
        validate_topic(topic)?;
        Ok(Self {
            id: AgentId::generate(),
            session_id: parent.session_id.clone(),
            parent_id: Some(parent.id.clone()),
            kind: AgentKind::Branch,
            topic: topic.trim().to_string(),
            config,
            depth: parent.depth + 1,
            status: AgentStatus::Active,
            created_at: now(),
        })
    }

    pub fn is_main(&self) -> bool {
        self.kind == AgentKind::Main
    }
}

/// Topics must be non-blank and at most [`MAX_TOPIC_LEN`] characters.
pub fn validate_topic(topic: &str) -> Result<(), EngineError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput("Topic cannot be empty".to_string()));
    }
    let len = trimmed.chars().count();
    if len > MAX_TOPIC_LEN {
        return Err(EngineError::InvalidInput(format!(
            "Topic is {} characters long (maximum {})",
            len, MAX_TOPIC_LEN
        )));
    }
    Ok(())
}
