//! Pipe-joined conversation digests.

use crate::message::{Message, Role};
use crate::relevance::{self, text};
use std::collections::HashSet;

/// Messages scoring above this are treated as key messages.
const KEY_MESSAGE_THRESHOLD: f64 = 0.3;
const MAX_CONCEPTS: usize = 5;
const MAX_DISCUSSION_KEYWORDS: usize = 5;
const KEYWORDS_PER_QUESTION: usize = 3;
const QA_SNIPPET_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

/// Summarize `messages` for `topic` in at most `max_len` characters.
///
/// Parts, joined with `" | "`: topic line, concept line (capitalized and
/// CamelCase tokens from key messages), discussion line (keywords from
/// question/answer pairs among key messages) and a turn count.
pub fn summarize(messages: &[Message], topic: &str, max_len: usize) -> String {
    if messages.is_empty() {
        return new_topic_line(topic);
    }

    let key_messages: Vec<&Message> = messages
        .iter()
        .filter(|m| relevance::score(&m.content, topic, None) > KEY_MESSAGE_THRESHOLD)
        .collect();

    let mut parts = vec![format!("Topic: {}", topic)];

    let concepts = key_concepts(&key_messages);
    if !concepts.is_empty() {
        parts.push(format!("Key concepts: {}", concepts.join(", ")));
    }

    let pairs = qa_pairs(&key_messages);
    if !pairs.is_empty() {
        parts.push(format!("Discussion: {}", discussion_line(&pairs)));
    }

    let questions = messages.iter().filter(|m| m.role == Role::User).count();
    let answers = messages.iter().filter(|m| m.role == Role::Assistant).count();
    parts.push(format!("Turns: {} questions / {} answers", questions, answers));

    truncate_chars(&parts.join(" | "), max_len)
}

/// Fixed line used when there is no history to summarize.
pub fn new_topic_line(topic: &str) -> String {
    format!("Starting new topic: {}", topic)
}

fn key_concepts(messages: &[&Message]) -> Vec<String> {
    let mut seen = HashSet::new();
    messages
        .iter()
        .flat_map(|m| text::concept_list(&m.content))
        .filter(|c| seen.insert(c.clone()))
        .take(MAX_CONCEPTS)
        .collect()
}

/// Consecutive user -> assistant turns, each side cut to a short snippet.
fn qa_pairs(messages: &[&Message]) -> Vec<(String, String)> {
    messages
        .windows(2)
        .filter(|w| w[0].role == Role::User && w[1].role == Role::Assistant)
        .map(|w| {
            (
                w[0].content.chars().take(QA_SNIPPET_CHARS).collect::<String>(),
                w[1].content.chars().take(QA_SNIPPET_CHARS).collect::<String>(),
            )
        })
        .filter(|(q, a)| !q.is_empty() && !a.is_empty())
        .collect()
}

fn discussion_line(pairs: &[(String, String)]) -> String {
    let mut seen = HashSet::new();
    let keywords: Vec<String> = pairs
        .iter()
        .flat_map(|(question, _)| {
            text::keyword_list(question)
                .into_iter()
                .take(KEYWORDS_PER_QUESTION)
        })
        .filter(|k| seen.insert(k.clone()))
        .take(MAX_DISCUSSION_KEYWORDS)
        .collect();

    if keywords.is_empty() {
        format!("{} question/answer exchanges", pairs.len())
    } else {
        format!("covered {}", keywords.join(", "))
    }
}

/// Cut to `max_len` characters, ending in an ellipsis when anything was dropped.
pub(crate) fn truncate_chars(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= ELLIPSIS.len() {
        return s.chars().take(max_len).collect();
    }
    let keep = max_len - ELLIPSIS.len();
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
