//! Error types for the branchstack engine.

use crate::types::AgentId;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage conflict: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Engine-level errors surfaced by the frame manager and chat flow
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Agent not found: {0}")]
    NotFound(AgentId),

    #[error("Stack depth exceeded: depth {depth} is over the maximum of {max}")]
    DepthExceeded { depth: u32, max: u32 },

    /// Raised by the frame cache when the advisory capacity is reached.
    /// The manager answers it with an eviction; callers never see it.
    #[error("Active frame capacity exhausted: {active} active of {capacity}")]
    CapacityExhausted { active: usize, capacity: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    #[error("Completion authentication failed: {0}")]
    CompletionAuthFailed(String),

    #[error("Completion rate limit exceeded: {0}")]
    CompletionRateLimit(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}
