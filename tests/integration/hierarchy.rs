//! Session hierarchy, recursive deletion and statistics

use super::test_utils::{add_pairs, engine, memory_manager};
use branchstack::agent::AgentKind;
use branchstack::error::EngineError;
use branchstack::frame::InheritanceMode;
use branchstack::metadata::Metadata;
use branchstack::types::{MessageId, SessionId};

#[tokio::test]
async fn test_session_hierarchy_nests_children() {
    let (_, manager) = memory_manager(engine(5, 10));
    let session = SessionId::from("tree-session");
    let main = manager
        .create_main(&session, "Root topic", Metadata::new())
        .await
        .unwrap();
    let trigger = MessageId::generate();
    let left = manager
        .create_branch(&main, "Left", &trigger, InheritanceMode::None)
        .await
        .unwrap();
    let right = manager
        .create_branch(&main, "Right", &trigger, InheritanceMode::None)
        .await
        .unwrap();
    let leaf = manager
        .create_branch(&left, "Leaf", &trigger, InheritanceMode::None)
        .await
        .unwrap();

    let forest = manager.session_hierarchy(&session).await.unwrap();
    assert_eq!(forest.len(), 1);
    let root = &forest[0];
    assert_eq!(root.id, main);
    assert_eq!(root.kind, AgentKind::Main);
    assert_eq!(root.size(), 4);

    let child_ids: Vec<_> = root.children.iter().map(|c| c.id.clone()).collect();
    assert_eq!(child_ids, vec![left.clone(), right.clone()]);
    assert_eq!(root.children[0].children[0].id, leaf);
    assert_eq!(root.children[0].children[0].depth, 2);
    assert_eq!(root.children[0].children[0].parent_id.as_ref(), Some(&left));

    assert_eq!(manager.children(&main), vec![left.clone(), right]);
    assert_eq!(manager.memory_stats().hierarchy_node_count, 2);
}

#[tokio::test]
async fn test_unknown_session_has_empty_forest() {
    let (_, manager) = memory_manager(engine(5, 10));
    let forest = manager
        .session_hierarchy(&SessionId::from("nobody"))
        .await
        .unwrap();
    assert!(forest.is_empty());
}

#[tokio::test]
async fn test_recursive_delete_removes_whole_tree() {
    let (store, manager) = memory_manager(engine(5, 10));
    let session = SessionId::from("doomed");
    let main = manager
        .create_main(&session, "Main", Metadata::new())
        .await
        .unwrap();
    add_pairs(&manager, &main, 2, |i| format!("q{}", i), |i| format!("a{}", i)).await;
    let trigger = MessageId::generate();
    let b1 = manager
        .create_branch(&main, "B1", &trigger, InheritanceMode::Full)
        .await
        .unwrap();
    let b2 = manager
        .create_branch(&main, "B2", &trigger, InheritanceMode::None)
        .await
        .unwrap();
    let grand = manager
        .create_branch(&b1, "Grand", &trigger, InheritanceMode::Selective)
        .await
        .unwrap();
    add_pairs(&manager, &grand, 1, |_| "deep q".to_string(), |_| "deep a".to_string()).await;

    let removed = manager.delete_branch(&main, true).await.unwrap();
    assert_eq!(removed, 4);

    assert_eq!(store.agent_count(), 0);
    assert_eq!(store.frame_count(), 0);
    assert_eq!(store.message_count(), 0);
    for id in [&main, &b1, &b2, &grand] {
        assert!(matches!(
            manager.get_context(id).await,
            Err(EngineError::NotFound(_))
        ));
    }
    let stats = manager.memory_stats();
    assert_eq!(stats.total_frames, 0);
    assert_eq!(stats.hierarchy_node_count, 0);
    assert!(manager
        .session_hierarchy(&session)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_non_recursive_delete_refuses_parents() {
    let (store, manager) = memory_manager(engine(5, 10));
    let main = manager
        .create_main(&SessionId::generate(), "Main", Metadata::new())
        .await
        .unwrap();
    let branch = manager
        .create_branch(&main, "Only child", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap();

    let err = manager.delete_branch(&main, false).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(store.agent_count(), 2);

    assert_eq!(manager.delete_branch(&branch, false).await.unwrap(), 1);
    assert!(manager.children(&main).is_empty());
    assert_eq!(store.agent_count(), 1);
}

#[tokio::test]
async fn test_delete_unknown_agent_is_not_found() {
    let (_, manager) = memory_manager(engine(5, 10));
    let err = manager
        .delete_branch(&"missing".into(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}
