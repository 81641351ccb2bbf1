//! Shared fixtures for integration tests

use branchstack::config::EngineConfig;
use branchstack::manager::StackManager;
use branchstack::message::Role;
use branchstack::metadata::Metadata;
use branchstack::store::MemoryPersistence;
use branchstack::types::{AgentId, SessionId};
use std::sync::Arc;

pub fn engine(max_depth: u32, max_active: usize) -> EngineConfig {
    EngineConfig {
        max_stack_depth: max_depth,
        max_active_frames: max_active,
        ..EngineConfig::default()
    }
}

pub fn memory_manager(settings: EngineConfig) -> (Arc<MemoryPersistence>, Arc<StackManager>) {
    let store = Arc::new(MemoryPersistence::new());
    let manager = Arc::new(StackManager::new(store.clone(), settings));
    (store, manager)
}

pub async fn main_agent(manager: &StackManager, topic: &str) -> AgentId {
    manager
        .create_main(&SessionId::generate(), topic, Metadata::new())
        .await
        .unwrap()
}

/// Append `pairs` user/assistant exchanges built from `question` and `answer`.
pub async fn add_pairs<Q, A>(manager: &StackManager, agent: &AgentId, pairs: usize, question: Q, answer: A)
where
    Q: Fn(usize) -> String,
    A: Fn(usize) -> String,
{
    for i in 0..pairs {
        manager
            .add_message(agent, Role::User, &question(i), Metadata::new())
            .await
            .unwrap();
        manager
            .add_message(agent, Role::Assistant, &answer(i), Metadata::new())
            .await
            .unwrap();
    }
}
