//! Sled-backed persistence for agents, frames and messages.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};

use crate::agent::{AgentRecord, AgentStatus};
use crate::error::StorageError;
use crate::frame::StackFrame;
use crate::message::Message;
use crate::store::{sort_by_depth, Persistence};
use crate::types::{AgentId, SessionId};

const TREE_AGENTS: &str = "agents";
const TREE_SESSION_AGENTS: &str = "session_agents";
const TREE_SESSION_MAIN: &str = "session_main";
const TREE_CHILD_AGENTS: &str = "child_agents";
const TREE_FRAMES: &str = "frames";
const TREE_MESSAGES: &str = "messages";

/// Sled implementation of [`Persistence`]
///
/// Rows are JSON. Index and message keys start with the owner id prefixed by
/// its big-endian `u32` byte length, so one owner's prefix never matches
/// another owner's keys whatever characters the ids contain. Index keys then
/// carry the member id; message keys carry a big-endian sequence from
/// [`Db::generate_id`] so scans come back in insertion order.
#[derive(Clone)]
pub struct SledPersistence {
    db: Db,
    agents: Tree,
    session_agents: Tree,
    session_main: Tree,
    child_agents: Tree,
    frames: Tree,
    messages: Tree,
}

impl SledPersistence {
    /// Open (or create) a store in the directory at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::new(db)
    }

    /// Temporary store removed when dropped.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(to_storage_io)?;
        Self::new(db)
    }

    pub fn new(db: Db) -> Result<Self, StorageError> {
        Ok(Self {
            agents: db.open_tree(TREE_AGENTS).map_err(to_storage_io)?,
            session_agents: db.open_tree(TREE_SESSION_AGENTS).map_err(to_storage_io)?,
            session_main: db.open_tree(TREE_SESSION_MAIN).map_err(to_storage_io)?,
            child_agents: db.open_tree(TREE_CHILD_AGENTS).map_err(to_storage_io)?,
            frames: db.open_tree(TREE_FRAMES).map_err(to_storage_io)?,
            messages: db.open_tree(TREE_MESSAGES).map_err(to_storage_io)?,
            db,
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    fn read_agent(&self, agent_id: &AgentId) -> Result<Option<AgentRecord>, StorageError> {
        get_json(&self.agents, agent_id.as_str().as_bytes())
    }

    /// Resolve the agent ids stored as values under `prefix` in an index tree.
    fn agents_under(&self, index: &Tree, prefix: &[u8]) -> Result<Vec<AgentRecord>, StorageError> {
        let mut out = Vec::new();
        for result in index.scan_prefix(prefix) {
            let (_, value) = result.map_err(to_storage_io)?;
            let agent_id = AgentId::from(String::from_utf8_lossy(&value).into_owned());
            if let Some(agent) = self.read_agent(&agent_id)? {
                out.push(agent);
            }
        }
        Ok(out)
    }

    fn remove_prefix(tree: &Tree, prefix: &[u8]) -> Result<usize, StorageError> {
        let keys: Vec<sled::IVec> = tree
            .scan_prefix(prefix)
            .keys()
            .collect::<Result<_, _>>()
            .map_err(to_storage_io)?;
        let mut removed = 0usize;
        for key in keys {
            if tree.remove(key).map_err(to_storage_io)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl Persistence for SledPersistence {
    async fn insert_agent(&self, agent: &AgentRecord) -> Result<(), StorageError> {
        if agent.is_main() {
            let claimed = self
                .session_main
                .compare_and_swap(
                    agent.session_id.as_str().as_bytes(),
                    None as Option<&[u8]>,
                    Some(agent.id.as_str().as_bytes()),
                )
                .map_err(to_storage_io)?;
            if claimed.is_err() {
                return Err(StorageError::Conflict(format!(
                    "Session {} already has a main agent",
                    agent.session_id
                )));
            }
        }

        put_json(&self.agents, agent.id.as_str().as_bytes(), agent)?;
        self.session_agents
            .insert(
                index_key(agent.session_id.as_str(), agent.id.as_str()),
                agent.id.as_str().as_bytes(),
            )
            .map_err(to_storage_io)?;
        if let Some(parent_id) = &agent.parent_id {
            self.child_agents
                .insert(
                    index_key(parent_id.as_str(), agent.id.as_str()),
                    agent.id.as_str().as_bytes(),
                )
                .map_err(to_storage_io)?;
        }
        Ok(())
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<AgentRecord>, StorageError> {
        self.read_agent(agent_id)
    }

    async fn update_agent_status(
        &self,
        agent_id: &AgentId,
        status: AgentStatus,
    ) -> Result<usize, StorageError> {
        let Some(mut agent) = self.read_agent(agent_id)? else {
            return Ok(0);
        };
        agent.status = status;
        put_json(&self.agents, agent_id.as_str().as_bytes(), &agent)?;
        Ok(1)
    }

    async fn list_children(&self, parent_id: &AgentId) -> Result<Vec<AgentRecord>, StorageError> {
        let mut children = self.agents_under(&self.child_agents, &prefix_of(parent_id.as_str()))?;
        children.sort_by_key(|a| a.created_at);
        Ok(children)
    }

    async fn list_session_agents(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<AgentRecord>, StorageError> {
        let mut agents =
            self.agents_under(&self.session_agents, &prefix_of(session_id.as_str()))?;
        sort_by_depth(&mut agents);
        Ok(agents)
    }

    async fn insert_frame(&self, frame: &StackFrame) -> Result<(), StorageError> {
        put_json(&self.frames, frame.agent_id.as_str().as_bytes(), frame)
    }

    async fn get_latest_frame(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<StackFrame>, StorageError> {
        get_json(&self.frames, agent_id.as_str().as_bytes())
    }

    async fn update_frame(&self, frame: &StackFrame) -> Result<usize, StorageError> {
        let key = frame.agent_id.as_str().as_bytes();
        if !self.frames.contains_key(key).map_err(to_storage_io)? {
            return Ok(0);
        }
        put_json(&self.frames, key, frame)?;
        Ok(1)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StorageError> {
        let seq = self.db.generate_id().map_err(to_storage_io)?;
        let key = message_key(message.agent_id.as_str(), seq);
        put_json(&self.messages, &key, message)
    }

    async fn list_messages(&self, agent_id: &AgentId) -> Result<Vec<Message>, StorageError> {
        let mut out = Vec::new();
        for result in self.messages.scan_prefix(prefix_of(agent_id.as_str())) {
            let (_, value) = result.map_err(to_storage_io)?;
            out.push(serde_json::from_slice(&value).map_err(to_storage_data)?);
        }
        Ok(out)
    }

    async fn delete_messages_by_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError> {
        Self::remove_prefix(&self.messages, &prefix_of(agent_id.as_str()))
    }

    async fn delete_frame_by_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError> {
        let removed = self
            .frames
            .remove(agent_id.as_str().as_bytes())
            .map_err(to_storage_io)?;
        Ok(usize::from(removed.is_some()))
    }

    async fn delete_agent(&self, agent_id: &AgentId) -> Result<usize, StorageError> {
        let Some(agent) = self.read_agent(agent_id)? else {
            return Ok(0);
        };

        let id = agent.id.as_str();
        self.session_agents
            .remove(index_key(agent.session_id.as_str(), id))
            .map_err(to_storage_io)?;
        if let Some(parent_id) = &agent.parent_id {
            self.child_agents
                .remove(index_key(parent_id.as_str(), id))
                .map_err(to_storage_io)?;
        }
        Self::remove_prefix(&self.child_agents, &prefix_of(id))?;
        if agent.is_main() {
            self.session_main
                .remove(agent.session_id.as_str().as_bytes())
                .map_err(to_storage_io)?;
        }
        self.agents.remove(id.as_bytes()).map_err(to_storage_io)?;
        Ok(1)
    }
}

fn prefix_of(owner: &str) -> Vec<u8> {
    let owner = owner.as_bytes();
    let mut key = Vec::with_capacity(4 + owner.len());
    key.extend_from_slice(&(owner.len() as u32).to_be_bytes());
    key.extend_from_slice(owner);
    key
}

fn index_key(owner: &str, member: &str) -> Vec<u8> {
    let mut key = prefix_of(owner);
    key.extend_from_slice(member.as_bytes());
    key
}

fn message_key(agent_id: &str, seq: u64) -> Vec<u8> {
    let mut key = prefix_of(agent_id);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn get_json<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> Result<Option<T>, StorageError> {
    let Some(raw) = tree.get(key).map_err(to_storage_io)? else {
        return Ok(None);
    };
    let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
    Ok(Some(parsed))
}

fn put_json<T: Serialize>(tree: &Tree, key: &[u8], value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(value).map_err(to_storage_data)?;
    tree.insert(key, bytes).map_err(to_storage_io)?;
    Ok(())
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
