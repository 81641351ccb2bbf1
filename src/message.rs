//! Messages owned by an agent's frame.

use crate::error::EngineError;
use crate::metadata::Metadata;
use crate::types::{now, AgentId, MessageId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(EngineError::InvalidInput(format!(
                "Unknown message role: {} (must be 'user', 'assistant', or 'system')",
                other
            ))),
        }
    }
}

/// A single message in an agent's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub agent_id: AgentId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub timestamp: Timestamp,
}

impl Message {
    /// Stamp a new message with a fresh id and the current time.
    pub fn new(agent_id: AgentId, role: Role, content: String, metadata: Metadata) -> Self {
        Self {
            id: MessageId::generate(),
            agent_id,
            role,
            content,
            metadata,
            timestamp: now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Key used to de-duplicate messages: the id, or a content prefix when the id is blank.
    pub fn dedup_key(&self) -> String {
        if self.id.as_str().is_empty() {
            self.content.chars().take(50).collect()
        } else {
            self.id.to_string()
        }
    }
}

/// Reject blank message content.
pub fn validate_content(content: &str) -> Result<(), EngineError> {
    if content.trim().is_empty() {
        return Err(EngineError::InvalidInput(
            "Message content cannot be empty".to_string(),
        ));
    }
    Ok(())
}
