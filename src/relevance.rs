//! Relevance Engine
//!
//! Pure scoring, ranking and summarization over message text. Two fidelities
//! are offered: [`score`] blends five signals (lexical, semantic, importance,
//! coherence, structure) and is used by top-k selection and summarization;
//! [`quick_score`] is a cheap topic-word blend used when seeding a branch.

pub mod select;
pub mod signals;
pub mod similarity;
pub mod summary;
pub mod text;

pub use select::select_top_k;
pub use summary::summarize;

use crate::message::Message;
use std::collections::HashSet;

/// Blend weights for the five relevance signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceWeights {
    pub lexical: f64,
    pub semantic: f64,
    pub importance: f64,
    pub coherence: f64,
    pub structure: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            lexical: 0.25,
            semantic: 0.25,
            importance: 0.20,
            coherence: 0.15,
            structure: 0.15,
        }
    }
}

/// Score `text` against `topic` in [0, 1] with the default weights.
///
/// `context` is the run of messages preceding `text`; only the last three
/// feed the coherence signal. Blank text or topic scores 0.
pub fn score(text: &str, topic: &str, context: Option<&[Message]>) -> f64 {
    score_with(&RelevanceWeights::default(), text, topic, context)
}

pub fn score_with(
    weights: &RelevanceWeights,
    text: &str,
    topic: &str,
    context: Option<&[Message]>,
) -> f64 {
    if text.trim().is_empty() || topic.trim().is_empty() {
        return 0.0;
    }

    let lexical = similarity::lexical(text, topic);
    let semantic = similarity::semantic(text, topic);
    let importance = signals::importance(text);
    let coherence = context.map_or(0.0, |ctx| signals::coherence(text, ctx));
    let structure = signals::structure(text);

    let total = weights.lexical * lexical
        + weights.semantic * semantic
        + weights.importance * importance
        + weights.coherence * coherence
        + weights.structure * structure;
    total.clamp(0.0, 1.0)
}

/// Cheap two-term blend: 0.6 x topic-word containment + 0.4 x whole-word overlap.
///
/// Topic words are the lowercased whitespace-separated tokens of `topic`.
/// Containment counts topic words found anywhere in the text as substrings;
/// overlap counts topic words that appear as whole whitespace tokens.
pub fn quick_score(text: &str, topic: &str) -> f64 {
    let text_lower = text.to_lowercase();
    let topic_lower = topic.to_lowercase();
    let topic_words: HashSet<&str> = topic_lower.split_whitespace().collect();
    if text_lower.trim().is_empty() || topic_words.is_empty() {
        return 0.0;
    }
    let text_words: HashSet<&str> = text_lower.split_whitespace().collect();

    let total = topic_words.len() as f64;
    let overlap = topic_words.intersection(&text_words).count() as f64 / total;
    let contained = topic_words
        .iter()
        .filter(|word| text_lower.contains(*word))
        .count() as f64
        / total;

    0.6 * contained + 0.4 * overlap
}
