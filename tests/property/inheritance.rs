//! Inheritance and switch-history properties

use branchstack::frame::{InheritanceMode, InheritedContext};
use branchstack::manager::history::{SwitchHistory, HISTORY_CAPACITY, HISTORY_RETAIN};
use branchstack::message::{Message, Role};
use branchstack::metadata::Metadata;
use branchstack::types::AgentId;
use proptest::prelude::*;

fn history(raw: &[String]) -> Vec<Message> {
    let agent = AgentId::from("parent");
    raw.iter()
        .enumerate()
        .map(|(i, content)| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            Message::new(agent.clone(), role, content.clone(), Metadata::new())
        })
        .collect()
}

/// none is always empty and full always copies every parent message
#[test]
fn test_none_and_full_modes() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec("[a-z ]{1,30}", 0..30),
                "[A-Za-z ]{0,12}",
            ),
            |(raw, topic)| {
                let parent = history(&raw);
                let source = AgentId::from("parent");

                let none = InheritedContext::derive(&source, &parent, InheritanceMode::None, &topic);
                prop_assert_eq!(none, InheritedContext::None);

                let full = InheritedContext::derive(&source, &parent, InheritanceMode::Full, &topic);
                prop_assert_eq!(full.messages().len(), parent.len());
                Ok(())
            },
        )
        .unwrap();
}

/// Selective bundles hold between min(2, n) and 5 distinct parent messages
#[test]
fn test_selective_bounds() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                proptest::collection::vec("[a-z ]{1,30}", 0..30),
                "[a-z ]{0,12}",
            ),
            |(raw, topic)| {
                let parent = history(&raw);
                let bundle = InheritedContext::derive(
                    &AgentId::from("parent"),
                    &parent,
                    InheritanceMode::Selective,
                    &topic,
                );
                let picked = bundle.messages();
                prop_assert!(picked.len() <= 5);
                prop_assert!(picked.len() >= parent.len().min(2));

                let mut ids: Vec<_> = picked.iter().map(|m| m.id.clone()).collect();
                prop_assert!(picked.iter().all(|m| parent.iter().any(|p| p.id == m.id)));
                ids.sort();
                ids.dedup();
                prop_assert_eq!(ids.len(), picked.len());
                Ok(())
            },
        )
        .unwrap();
}

/// The switch log never holds more than its capacity
#[test]
fn test_switch_history_is_bounded() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0usize..400), |pushes| {
            let mut log = SwitchHistory::new();
            for i in 0..pushes {
                log.push(None, AgentId::from(format!("a{}", i)), "prop");
                prop_assert!(log.len() <= HISTORY_CAPACITY);
            }
            if pushes > HISTORY_CAPACITY {
                prop_assert!(log.len() >= HISTORY_RETAIN);
                let newest = log.recent(1);
                prop_assert_eq!(newest[0].to.as_str(), format!("a{}", pushes - 1));
            }
            Ok(())
        })
        .unwrap();
}
