//! Single-text signals: importance cues, local coherence and structure.

use crate::message::Message;
use crate::relevance::similarity;
use regex::Regex;
use std::sync::LazyLock;

static CODE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[\s\S]*?```|`[^`]+`").unwrap());
static CODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[\s\S]*?```").unwrap());
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*[-*+]\s").unwrap());
static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s").unwrap());
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^*]+\*\*|__[^_]+__").unwrap());

/// Domain cue words and their additive weights.
const IMPORTANCE_CUES: &[(&str, f64)] = &[
    ("problem", 2.0),
    ("solution", 2.0),
    ("method", 1.8),
    ("principle", 1.8),
    ("implement", 1.5),
    ("design", 1.5),
    ("algorithm", 2.0),
    ("architecture", 1.8),
    ("system", 1.5),
    ("function", 1.3),
    ("feature", 1.3),
    ("optimize", 1.5),
];

const QUESTION_WEIGHT: f64 = 0.5;
const CODE_SPAN_WEIGHT: f64 = 0.3;
const IMPORTANCE_CEILING: f64 = 5.0;
const STRUCTURE_ELEMENT_WEIGHT: f64 = 0.2;
const COHERENCE_WINDOW: usize = 3;

/// Additive cue score normalized into [0, 1].
pub fn importance(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let cues: f64 = IMPORTANCE_CUES
        .iter()
        .filter(|(cue, _)| lower.contains(cue))
        .map(|(_, weight)| weight)
        .sum();
    let questions = text.chars().filter(|c| *c == '?' || *c == '？').count() as f64;
    let code_spans = CODE_SPAN_RE.find_iter(text).count() as f64;

    let raw = cues + questions * QUESTION_WEIGHT + code_spans * CODE_SPAN_WEIGHT;
    (raw / IMPORTANCE_CEILING).min(1.0)
}

/// Mean lexical similarity to the last few non-empty context messages.
pub fn coherence(text: &str, context: &[Message]) -> f64 {
    let start = context.len().saturating_sub(COHERENCE_WINDOW);
    let scores: Vec<f64> = context[start..]
        .iter()
        .filter(|m| !m.content.is_empty())
        .map(|m| similarity::lexical(text, &m.content))
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Length curve peaking for 100-500 characters.
fn length_weight(len: usize) -> f64 {
    match len {
        0..=19 => 0.3,
        20..=99 => 0.7,
        100..=499 => 1.0,
        500..=999 => 0.8,
        _ => 0.6,
    }
}

/// Mean of the length curve and a markup bonus for lists, code blocks and bold text.
pub fn structure(text: &str) -> f64 {
    let elements = BULLET_RE.find_iter(text).count()
        + NUMBERED_RE.find_iter(text).count()
        + CODE_BLOCK_RE.find_iter(text).count()
        + BOLD_RE.find_iter(text).count();
    let markup = (elements as f64 * STRUCTURE_ELEMENT_WEIGHT).min(1.0);
    (length_weight(text.chars().count()) + markup) / 2.0
}
