//! Chat turns through the scripted completion client

use super::test_utils::{add_pairs, engine, main_agent, memory_manager};
use branchstack::chat::{default_system_prompt, ChatFlow};
use branchstack::completion::{CompletionOptions, ScriptedCompletion};
use branchstack::config::EngineConfig;
use branchstack::error::EngineError;
use branchstack::frame::InheritanceMode;
use branchstack::message::Role;
use branchstack::metadata::{keys, Metadata};
use branchstack::types::{MessageId, SessionId};
use std::sync::Arc;

#[tokio::test]
async fn test_send_records_user_and_assistant_messages() {
    let (store, manager) = memory_manager(engine(5, 10));
    let main = main_agent(&manager, "Graph Theory").await;
    let client = Arc::new(ScriptedCompletion::with_replies(["A tree is an acyclic graph."]));
    let flow = ChatFlow::new(manager.clone(), client.clone(), CompletionOptions::default());

    let exchange = flow.send(&main, "What is a tree?").await.unwrap();
    assert_eq!(exchange.user_message.role, Role::User);
    assert_eq!(exchange.assistant_message.content, "A tree is an acyclic graph.");
    assert_eq!(
        exchange.user_message.metadata.text(keys::KEY_CONTEXT_MODE),
        Some("none")
    );

    let reply_meta = &exchange.assistant_message.metadata;
    assert_eq!(reply_meta.text(keys::KEY_MODEL), Some("scripted"));
    assert_eq!(reply_meta[keys::KEY_BRANCHABLE].as_bool(), Some(true));
    assert_eq!(reply_meta[keys::KEY_CONTEXT_USED].as_i64(), Some(1));
    assert_eq!(exchange.usage.completion_tokens, 6);
    assert_eq!(store.message_count(), 2);

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system_prompt, default_system_prompt("Graph Theory"));
    assert_eq!(requests[0].messages.last().unwrap().content, "What is a tree?");
}

#[tokio::test]
async fn test_configured_system_prompt_is_used() {
    let (_, manager) = memory_manager(engine(5, 10));
    let main = manager
        .create_main(
            &SessionId::generate(),
            "Poetry",
            Metadata::new().with(keys::KEY_SYSTEM_PROMPT, "Answer in haiku."),
        )
        .await
        .unwrap();
    let client = Arc::new(ScriptedCompletion::new());
    let flow = ChatFlow::new(manager, client.clone(), CompletionOptions::default());

    flow.send(&main, "Describe autumn").await.unwrap();
    assert_eq!(client.requests()[0].system_prompt, "Answer in haiku.");
}

#[tokio::test]
async fn test_branch_prompt_starts_with_inherited_context() {
    let (_, manager) = memory_manager(engine(5, 10));
    let main = main_agent(&manager, "Rust").await;
    add_pairs(
        &manager,
        &main,
        3,
        |i| format!("ownership question {}", i),
        |i| format!("ownership answer {}", i),
    )
    .await;
    let branch = manager
        .create_branch(&main, "Ownership", &MessageId::generate(), InheritanceMode::Summary)
        .await
        .unwrap();

    let client = Arc::new(ScriptedCompletion::new());
    let flow = ChatFlow::new(manager.clone(), client.clone(), CompletionOptions::default());
    let exchange = flow.send(&branch, "And moves?").await.unwrap();
    assert_eq!(exchange.assistant_message.content, "You said: And moves?");

    let requests = client.requests();
    let sent = &requests[0].messages;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].role, Role::System);
    assert!(sent[0].content.contains("Current topic: Ownership"));
    assert_eq!(
        exchange.user_message.metadata.text(keys::KEY_CONTEXT_MODE),
        Some("summary")
    );
}

#[tokio::test]
async fn test_long_history_is_windowed() {
    let settings = EngineConfig {
        max_context_messages: 4,
        ..EngineConfig::default()
    };
    let (_, manager) = memory_manager(settings);
    let main = main_agent(&manager, "Windows").await;
    add_pairs(&manager, &main, 5, |i| format!("q{}", i), |i| format!("a{}", i)).await;

    let client = Arc::new(ScriptedCompletion::new());
    let flow = ChatFlow::new(manager, client.clone(), CompletionOptions::default());
    let exchange = flow.send(&main, "latest").await.unwrap();

    let requests = client.requests();
    let sent = &requests[0].messages;
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[0].role, Role::System);
    assert!(sent[0].content.starts_with("Earlier in this conversation: "));
    assert_eq!(sent[4].content, "latest");
    assert_eq!(
        exchange.assistant_message.metadata[keys::KEY_CONTEXT_USED].as_i64(),
        Some(4)
    );
}

#[tokio::test]
async fn test_suspended_agent_cannot_chat() {
    let (store, manager) = memory_manager(engine(5, 10));
    let main = main_agent(&manager, "Paused").await;
    manager.suspend(&main).await.unwrap();

    let flow = ChatFlow::new(
        manager,
        Arc::new(ScriptedCompletion::new()),
        CompletionOptions::default(),
    );
    let err = flow.send(&main, "hello?").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(store.message_count(), 0);
}
