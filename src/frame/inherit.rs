//! Context Inheritance
//!
//! What a branch remembers from its parent. The bundle is computed once when
//! the branch frame is built and stored as an immutable snapshot; later parent
//! messages never leak into it unless a caller re-derives explicitly.

use crate::error::EngineError;
use crate::message::{Message, Role};
use crate::relevance;
use crate::types::{now, AgentId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Messages kept when selective inheritance has no topic to rank by, and the
/// backfill taken when too few messages survive ranking.
const RECENT_FALLBACK: usize = 3;
const SELECTIVE_MIN: usize = 3;
const SELECTIVE_MAX: usize = 5;
/// Ranked messages must score strictly above this to be kept.
const SELECTIVE_THRESHOLD: f64 = 0.1;
/// Fewer survivors than this triggers the recency backfill.
const SELECTIVE_MIN_SURVIVORS: usize = 2;

const DIGEST_QUESTIONS: usize = 3;
const DIGEST_QUESTION_CHARS: usize = 80;
const DIGEST_ANSWERS: usize = 2;
const DIGEST_ANSWER_CHARS: usize = 100;

/// Strategy used to seed a branch from its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceMode {
    None,
    Full,
    #[default]
    Selective,
    Summary,
}

impl InheritanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InheritanceMode::None => "none",
            InheritanceMode::Full => "full",
            InheritanceMode::Selective => "selective",
            InheritanceMode::Summary => "summary",
        }
    }
}

impl fmt::Display for InheritanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InheritanceMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(InheritanceMode::None),
            "full" => Ok(InheritanceMode::Full),
            "selective" => Ok(InheritanceMode::Selective),
            "summary" => Ok(InheritanceMode::Summary),
            other => Err(EngineError::InvalidInput(format!(
                "Unknown inheritance mode: {} (must be 'none', 'full', 'selective', or 'summary')",
                other
            ))),
        }
    }
}

/// Inherited-context snapshot, tagged with the mode that produced it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum InheritedContext {
    #[default]
    None,
    Full {
        messages: Vec<Message>,
        source_agent_id: AgentId,
        message_count: usize,
        inherited_at: Timestamp,
    },
    Selective {
        messages: Vec<Message>,
        source_agent_id: AgentId,
        message_count: usize,
        selection_criteria: String,
        inherited_at: Timestamp,
    },
    Summary {
        summary: String,
        source_agent_id: AgentId,
        original_message_count: usize,
        summary_topic: String,
        inherited_at: Timestamp,
    },
}

impl InheritedContext {
    /// Derive a bundle from `parent_messages` owned by `source`.
    pub fn derive(
        source: &AgentId,
        parent_messages: &[Message],
        mode: InheritanceMode,
        topic: &str,
    ) -> Self {
        match mode {
            InheritanceMode::None => InheritedContext::None,
            InheritanceMode::Full => InheritedContext::Full {
                messages: parent_messages.to_vec(),
                source_agent_id: source.clone(),
                message_count: parent_messages.len(),
                inherited_at: now(),
            },
            InheritanceMode::Selective => {
                let messages = select_relevant(parent_messages, topic);
                InheritedContext::Selective {
                    message_count: messages.len(),
                    messages,
                    source_agent_id: source.clone(),
                    selection_criteria: topic.to_string(),
                    inherited_at: now(),
                }
            }
            InheritanceMode::Summary => InheritedContext::Summary {
                summary: digest(parent_messages, topic),
                source_agent_id: source.clone(),
                original_message_count: parent_messages.len(),
                summary_topic: topic.to_string(),
                inherited_at: now(),
            },
        }
    }

    pub fn mode(&self) -> InheritanceMode {
        match self {
            InheritedContext::None => InheritanceMode::None,
            InheritedContext::Full { .. } => InheritanceMode::Full,
            InheritedContext::Selective { .. } => InheritanceMode::Selective,
            InheritedContext::Summary { .. } => InheritanceMode::Summary,
        }
    }

    /// Inherited messages; empty for `None` and `Summary`.
    pub fn messages(&self) -> &[Message] {
        match self {
            InheritedContext::Full { messages, .. } | InheritedContext::Selective { messages, .. } => {
                messages
            }
            InheritedContext::None | InheritedContext::Summary { .. } => &[],
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            InheritedContext::Summary { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn source_agent_id(&self) -> Option<&AgentId> {
        match self {
            InheritedContext::None => None,
            InheritedContext::Full { source_agent_id, .. }
            | InheritedContext::Selective { source_agent_id, .. }
            | InheritedContext::Summary { source_agent_id, .. } => Some(source_agent_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, InheritedContext::None)
    }
}

/// Rank parent messages by topic and keep a small relevant subset.
fn select_relevant(messages: &[Message], topic: &str) -> Vec<Message> {
    if messages.is_empty() || topic.trim().is_empty() {
        return recent(messages, RECENT_FALLBACK).to_vec();
    }

    let mut scored: Vec<(&Message, f64)> = messages
        .iter()
        .map(|m| (m, relevance::quick_score(&m.content, topic)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let take = SELECTIVE_MAX.min(SELECTIVE_MIN.max(scored.len() / 2));
    let mut selected: Vec<&Message> = scored
        .into_iter()
        .take(take)
        .filter(|(_, score)| *score > SELECTIVE_THRESHOLD)
        .map(|(m, _)| m)
        .collect();

    if selected.len() < SELECTIVE_MIN_SURVIVORS {
        selected.extend(recent(messages, RECENT_FALLBACK));
        let mut seen = HashSet::new();
        selected.retain(|m| seen.insert(m.dedup_key()));
        selected.truncate(SELECTIVE_MAX);
    }

    selected.into_iter().cloned().collect()
}

fn recent(messages: &[Message], n: usize) -> &[Message] {
    &messages[messages.len().saturating_sub(n)..]
}

/// Line-oriented digest of recent questions and answers.
fn digest(messages: &[Message], topic: &str) -> String {
    if messages.is_empty() {
        return relevance::summary::new_topic_line(topic);
    }

    let mut lines = vec![format!("Current topic: {}", topic)];

    let questions = snippets(messages, Role::User, DIGEST_QUESTIONS, DIGEST_QUESTION_CHARS);
    if !questions.is_empty() {
        lines.push(format!("Recent questions: {}", questions.join(" | ")));
    }

    let answers = snippets(messages, Role::Assistant, DIGEST_ANSWERS, DIGEST_ANSWER_CHARS);
    if !answers.is_empty() {
        lines.push(format!("Key points: {}", answers.join(" | ")));
    }

    lines.push(format!("Turns: {}", messages.len()));
    lines.join("\n")
}

/// Last `count` non-empty messages with `role`, oldest first, each cut to `chars`.
fn snippets(messages: &[Message], role: Role, count: usize, chars: usize) -> Vec<String> {
    let by_role: Vec<&Message> = messages.iter().filter(|m| m.role == role).collect();
    by_role[by_role.len().saturating_sub(count)..]
        .iter()
        .map(|m| m.content.chars().take(chars).collect::<String>())
        .filter(|s| !s.is_empty())
        .collect()
}
