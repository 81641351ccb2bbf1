//! Frame lifecycle: depth limit, capacity eviction, switching and completion

use super::test_utils::{add_pairs, engine, main_agent, memory_manager};
use branchstack::agent::AgentStatus;
use branchstack::error::{EngineError, StorageError};
use branchstack::frame::InheritanceMode;
use branchstack::message::Role;
use branchstack::metadata::Metadata;
use branchstack::types::{AgentId, MessageId, SessionId};

#[tokio::test]
async fn test_sixth_nested_branch_exceeds_depth() {
    let (_, manager) = memory_manager(engine(5, 100));
    let main = main_agent(&manager, "Nesting").await;

    let mut parent = main.clone();
    for level in 1..=5u32 {
        let child = manager
            .create_branch(
                &parent,
                &format!("Level {}", level),
                &MessageId::generate(),
                InheritanceMode::None,
            )
            .await
            .unwrap();
        assert_eq!(manager.get_context(&child).await.unwrap().depth, level);
        assert_eq!(manager.agent(&child).await.unwrap().depth, level);
        parent = child;
    }

    let err = manager
        .create_branch(&parent, "Too deep", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DepthExceeded { depth: 6, max: 5 }));
    assert_eq!(manager.children(&parent).len(), 0);
}

#[tokio::test]
async fn test_capacity_two_evicts_oldest_branch() {
    let (_, manager) = memory_manager(engine(5, 2));
    let main = main_agent(&manager, "Capacity").await;
    let trigger = MessageId::generate();

    let b1 = manager
        .create_branch(&main, "First", &trigger, InheritanceMode::None)
        .await
        .unwrap();
    let b2 = manager
        .create_branch(&main, "Second", &trigger, InheritanceMode::None)
        .await
        .unwrap();
    assert_eq!(
        manager.get_context(&b1).await.unwrap().status,
        AgentStatus::Suspended
    );

    let b3 = manager
        .create_branch(&main, "Third", &trigger, InheritanceMode::None)
        .await
        .unwrap();

    assert_eq!(manager.agent(&b2).await.unwrap().status, AgentStatus::Suspended);
    assert_eq!(manager.get_context(&b3).await.unwrap().status, AgentStatus::Active);
    assert_eq!(manager.get_context(&main).await.unwrap().status, AgentStatus::Active);

    let stats = manager.memory_stats();
    assert_eq!(stats.active_frames, 2);
    assert_eq!(stats.suspended_frames, 2);
    assert_eq!(stats.total_frames, 4);
}

#[tokio::test]
async fn test_eviction_never_suspends_main() {
    let (_, manager) = memory_manager(engine(5, 1));
    let main = main_agent(&manager, "Root").await;
    let trigger = MessageId::generate();

    // Nothing to evict: creation goes over the advisory cap.
    let b1 = manager
        .create_branch(&main, "One", &trigger, InheritanceMode::None)
        .await
        .unwrap();
    assert_eq!(manager.memory_stats().active_frames, 2);

    manager
        .create_branch(&main, "Two", &trigger, InheritanceMode::None)
        .await
        .unwrap();
    assert_eq!(manager.get_context(&main).await.unwrap().status, AgentStatus::Active);
    assert_eq!(manager.get_context(&b1).await.unwrap().status, AgentStatus::Suspended);
    assert_eq!(manager.memory_stats().active_frames, 2);
}

#[tokio::test]
async fn test_switch_logs_every_call() {
    let (_, manager) = memory_manager(engine(5, 10));
    let main = main_agent(&manager, "Switching").await;
    let branch = manager
        .create_branch(&main, "Aside", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap();

    manager.switch(Some(&main), &branch, "explore").await.unwrap();
    assert_eq!(manager.get_context(&main).await.unwrap().status, AgentStatus::Suspended);

    manager.switch(Some(&branch), &main, "return").await.unwrap();
    manager.switch(None, &main, "again").await.unwrap();
    assert_eq!(manager.get_context(&branch).await.unwrap().status, AgentStatus::Suspended);
    assert_eq!(manager.get_context(&main).await.unwrap().status, AgentStatus::Active);

    let history = manager.switch_history(0);
    let reasons: Vec<&str> = history.iter().map(|r| r.reason.as_str()).collect();
    assert_eq!(reasons, vec!["explore", "return", "again"]);
    assert_eq!(history[2].from, None);
    assert_eq!(manager.memory_stats().switch_history_count, 3);
}

#[tokio::test]
async fn test_switch_to_unknown_agent_is_not_found() {
    let (_, manager) = memory_manager(engine(5, 10));
    let err = manager
        .switch(None, &AgentId::from("ghost"), "nowhere")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(id) if id.as_str() == "ghost"));
    assert!(manager.switch_history(0).is_empty());
}

#[tokio::test]
async fn test_completed_agent_is_terminal() {
    let (_, manager) = memory_manager(engine(5, 10));
    let main = main_agent(&manager, "Finish").await;
    manager.complete(&main).await.unwrap();

    assert_eq!(manager.agent(&main).await.unwrap().status, AgentStatus::Completed);
    let err = manager
        .add_message(&main, Role::User, "still there?", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert!(manager.switch(None, &main, "revive").await.is_err());
}

#[tokio::test]
async fn test_second_main_in_session_is_rejected() {
    let (store, manager) = memory_manager(engine(5, 10));
    let session = SessionId::from("one-session");
    manager
        .create_main(&session, "First", Metadata::new())
        .await
        .unwrap();
    let err = manager
        .create_main(&session, "Second", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(store.agent_count(), 1);
}

#[tokio::test]
async fn test_failed_frame_insert_leaves_no_rows() {
    let (store, manager) = memory_manager(engine(5, 10));
    let main = main_agent(&manager, "Partial").await;
    store.fail_next_frame_insert();

    let err = manager
        .create_branch(&main, "Doomed", &MessageId::generate(), InheritanceMode::Full)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Persistence(StorageError::Unavailable(_))
    ));
    assert_eq!(store.agent_count(), 1);
    assert_eq!(store.frame_count(), 1);
    assert!(manager.children(&main).is_empty());
    assert_eq!(manager.memory_stats().total_frames, 1);
}

#[tokio::test]
async fn test_switch_to_completed_agent_leaves_source_active() {
    let (_, manager) = memory_manager(engine(5, 10));
    let main = main_agent(&manager, "Finished root").await;
    let branch = manager
        .create_branch(&main, "Still open", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap();
    manager.complete(&main).await.unwrap();

    let err = manager
        .switch(Some(&branch), &main, "back")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    assert_eq!(manager.agent(&branch).await.unwrap().status, AgentStatus::Active);
    assert_eq!(manager.get_context(&branch).await.unwrap().status, AgentStatus::Active);
    assert_eq!(manager.agent(&main).await.unwrap().status, AgentStatus::Completed);
    assert!(manager.switch_history(0).is_empty());
}

#[tokio::test]
async fn test_failed_branch_under_capacity_pressure_keeps_victim_active() {
    let (store, manager) = memory_manager(engine(5, 2));
    let main = main_agent(&manager, "Pressure").await;
    let victim = manager
        .create_branch(&main, "Oldest", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap();
    assert_eq!(manager.memory_stats().active_frames, 2);

    store.fail_next_frame_insert();
    let err = manager
        .create_branch(&main, "Doomed", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));

    assert_eq!(manager.agent(&victim).await.unwrap().status, AgentStatus::Active);
    assert_eq!(manager.get_context(&victim).await.unwrap().status, AgentStatus::Active);
    assert_eq!(manager.memory_stats().active_frames, 2);
    assert_eq!(store.agent_count(), 2);
    assert_eq!(store.frame_count(), 2);

    // The next successful create still evicts the same branch.
    let fresh = manager
        .create_branch(&main, "Replacement", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap();
    assert_eq!(manager.agent(&victim).await.unwrap().status, AgentStatus::Suspended);
    assert_eq!(manager.get_context(&fresh).await.unwrap().status, AgentStatus::Active);
}

#[tokio::test]
async fn test_branch_rejected_for_depth_evicts_nothing() {
    let (_, manager) = memory_manager(engine(1, 2));
    let main = main_agent(&manager, "Shallow").await;
    let leaf = manager
        .create_branch(&main, "Leaf", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap();

    let err = manager
        .create_branch(&leaf, "Too deep", &MessageId::generate(), InheritanceMode::None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DepthExceeded { depth: 2, max: 1 }));
    assert_eq!(manager.agent(&leaf).await.unwrap().status, AgentStatus::Active);
    assert_eq!(manager.memory_stats().active_frames, 2);
}

#[tokio::test]
async fn test_messages_write_through() {
    let (store, manager) = memory_manager(engine(5, 10));
    let main = main_agent(&manager, "Durable").await;
    add_pairs(
        &manager,
        &main,
        3,
        |i| format!("question {}", i),
        |i| format!("answer {}", i),
    )
    .await;

    assert_eq!(store.message_count(), 6);
    let tail = manager.conversation(&main, 2).await.unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].content, "question 2");
    assert_eq!(tail[1].content, "answer 2");
    assert_eq!(manager.get_context(&main).await.unwrap().current.messages.len(), 6);
}

#[tokio::test]
async fn test_blank_topic_and_content_are_rejected() {
    let (_, manager) = memory_manager(engine(5, 10));
    let err = manager
        .create_main(&SessionId::generate(), "   ", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let main = main_agent(&manager, "Fine").await;
    let err = manager
        .add_message(&main, Role::User, "", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}
