//! Branchstack: stack frames for branching conversations
//!
//! A bounded tree of conversational agents. Each agent owns a context frame
//! holding its own messages plus a snapshot inherited once from its parent
//! (none, full, selective or summary). The frame manager enforces depth and
//! active-capacity limits, evicts the oldest active branch when needed, and
//! keeps the hierarchy index and switch history.

pub mod agent;
pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod manager;
pub mod message;
pub mod metadata;
pub mod relevance;
pub mod store;
pub mod types;

pub use agent::{AgentKind, AgentRecord, AgentStatus};
pub use error::{EngineError, StorageError};
pub use frame::{FullContext, InheritanceMode, InheritedContext, StackFrame};
pub use manager::{MemoryStats, StackManager};
pub use message::{Message, Role};
pub use metadata::{MetaValue, Metadata};
pub use types::{AgentId, FrameId, MessageId, SessionId};
