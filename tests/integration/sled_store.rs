//! Frame manager over the sled store, including cold reloads

use super::test_utils::{add_pairs, engine};
use branchstack::agent::AgentStatus;
use branchstack::frame::InheritanceMode;
use branchstack::manager::StackManager;
use branchstack::metadata::Metadata;
use branchstack::store::SledPersistence;
use branchstack::types::{MessageId, SessionId};
use std::sync::Arc;
use tempfile::TempDir;

fn open_manager(dir: &TempDir) -> (Arc<SledPersistence>, StackManager) {
    let store = Arc::new(SledPersistence::open(dir.path().join("store")).unwrap());
    let manager = StackManager::new(store.clone(), engine(5, 10));
    (store, manager)
}

#[tokio::test]
async fn test_cold_start_rebuilds_frame_chain() {
    let dir = TempDir::new().unwrap();
    let session = SessionId::from("persisted");

    let (main, branch, grand) = {
        let (store, manager) = open_manager(&dir);
        let main = manager
            .create_main(&session, "Compilers", Metadata::new())
            .await
            .unwrap();
        add_pairs(
            &manager,
            &main,
            3,
            |i| format!("parser question {}", i),
            |i| format!("parser answer {}", i),
        )
        .await;
        let branch = manager
            .create_branch(&main, "parser", &MessageId::generate(), InheritanceMode::Full)
            .await
            .unwrap();
        let grand = manager
            .create_branch(&branch, "Lexing", &MessageId::generate(), InheritanceMode::Summary)
            .await
            .unwrap();
        manager.switch(Some(&main), &grand, "deep dive").await.unwrap();
        store.flush().unwrap();
        (main, branch, grand)
    };

    let (_store, manager) = open_manager(&dir);
    assert_eq!(manager.memory_stats().total_frames, 0);

    let context = manager.get_context(&grand).await.unwrap();
    assert_eq!(context.depth, 2);
    assert_eq!(context.parent_agent_id.as_ref(), Some(&branch));
    assert_eq!(context.inherited.mode(), InheritanceMode::Summary);

    // The whole ancestor chain is cached by one cold load.
    let stats = manager.memory_stats();
    assert_eq!(stats.total_frames, 3);
    assert_eq!(manager.children(&main), vec![branch.clone()]);
    assert_eq!(manager.children(&branch), vec![grand.clone()]);

    assert_eq!(
        manager.get_context(&main).await.unwrap().status,
        AgentStatus::Suspended
    );
    let full = manager.get_context(&branch).await.unwrap();
    assert_eq!(full.inherited.messages().len(), 6);
    assert_eq!(manager.conversation(&main, 0).await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_branching_from_a_cold_parent() {
    let dir = TempDir::new().unwrap();
    let session = SessionId::from("cold-parent");

    let main = {
        let (store, manager) = open_manager(&dir);
        let main = manager
            .create_main(&session, "Databases", Metadata::new())
            .await
            .unwrap();
        add_pairs(
            &manager,
            &main,
            2,
            |i| format!("index question {}", i),
            |i| format!("index answer {}", i),
        )
        .await;
        store.flush().unwrap();
        main
    };

    let (_store, manager) = open_manager(&dir);
    let branch = manager
        .create_branch(&main, "index", &MessageId::generate(), InheritanceMode::Selective)
        .await
        .unwrap();
    let context = manager.get_context(&branch).await.unwrap();
    assert_eq!(context.depth, 1);
    assert!(!context.inherited.messages().is_empty());

    let forest = manager.session_hierarchy(&session).await.unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].children.len(), 1);
    assert_eq!(manager.delete_branch(&main, true).await.unwrap(), 2);
}
