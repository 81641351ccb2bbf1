//! Scoring and top-k selection properties

use branchstack::message::{Message, Role};
use branchstack::metadata::Metadata;
use branchstack::relevance::{quick_score, score, select_top_k, summarize};
use branchstack::types::AgentId;
use proptest::prelude::*;

fn message_strategy() -> impl Strategy<Value = (bool, String)> {
    (any::<bool>(), "[A-Za-z ?`*\\-]{1,60}")
}

fn build(raw: &[(bool, String)]) -> Vec<Message> {
    let agent = AgentId::from("prop");
    raw.iter()
        .map(|(user, content)| {
            let role = if *user { Role::User } else { Role::Assistant };
            Message::new(agent.clone(), role, content.clone(), Metadata::new())
        })
        .collect()
}

/// Scores stay within [0, 1] for any text and topic
#[test]
fn test_scores_are_bounded() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&("\\PC{0,80}", "\\PC{0,20}"), |(text, topic)| {
            let full = score(&text, &topic, None);
            let quick = quick_score(&text, &topic);
            prop_assert!((0.0..=1.0).contains(&full), "score {} out of range", full);
            prop_assert!((0.0..=1.0).contains(&quick), "quick {} out of range", quick);
            if topic.trim().is_empty() || text.trim().is_empty() {
                prop_assert_eq!(full, 0.0);
            }
            Ok(())
        })
        .unwrap();
}

/// Top-k is an order-preserving subsequence of length min(k, len)
#[test]
fn test_select_top_k_is_ordered_subsequence() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec(message_strategy(), 0..24),
                "[A-Za-z ]{0,16}",
                0usize..12,
            ),
            |(raw, topic, k)| {
                let messages = build(&raw);
                let picked = select_top_k(&messages, &topic, k);
                prop_assert_eq!(picked.len(), k.min(messages.len()));

                let mut cursor = 0;
                for message in &picked {
                    let position = messages[cursor..]
                        .iter()
                        .position(|m| m.id == message.id);
                    prop_assert!(position.is_some(), "selection is out of order");
                    cursor += position.unwrap_or(0) + 1;
                }
                Ok(())
            },
        )
        .unwrap();
}

/// Summaries of non-empty histories respect the character budget
#[test]
fn test_summary_respects_budget() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec(message_strategy(), 1..16),
                "[A-Za-z ]{1,16}",
                16usize..200,
            ),
            |(raw, topic, max_len)| {
                let summary = summarize(&build(&raw), &topic, max_len);
                prop_assert!(summary.chars().count() <= max_len);
                prop_assert!(summary.starts_with("Topic: ") || summary.ends_with("..."));
                Ok(())
            },
        )
        .unwrap();
}
