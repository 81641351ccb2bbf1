//! Token extraction: words, keywords, bigram phrases and concept tokens.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());

/// Capitalized words ("Dijkstra").
static CAPITALIZED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").unwrap());

/// CamelCase / mixed-case technical terms ("HashMap", "iPhone").
static CAMEL_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]+(?:[A-Z][a-z]*)+\b").unwrap());

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "can", "this", "that", "these", "those", "i",
    "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORD_SET.contains(word)
}

/// Lowercased word tokens in order of appearance.
pub fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Distinct keywords in order of first appearance: longer than two characters, not stop words.
pub fn keyword_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() > 2 && !is_stop_word(w))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Keyword set for overlap measures.
pub fn keywords(text: &str) -> HashSet<String> {
    keyword_list(text).into_iter().collect()
}

/// Adjacent word pairs where neither word is a stop word.
pub fn key_phrases(text: &str) -> Vec<String> {
    let tokens = words(text);
    tokens
        .windows(2)
        .filter(|pair| !is_stop_word(&pair[0]) && !is_stop_word(&pair[1]))
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

/// Concept tokens (capitalized and CamelCase), distinct, ordered by position.
pub fn concept_list(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = CAPITALIZED_RE
        .find_iter(text)
        .chain(CAMEL_CASE_RE.find_iter(text))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    found.sort_by_key(|(start, _)| *start);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(_, token)| seen.insert(*token))
        .map(|(_, token)| token.to_string())
        .collect()
}

pub fn concepts(text: &str) -> HashSet<String> {
    concept_list(text).into_iter().collect()
}
