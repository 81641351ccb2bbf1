//! Set-overlap similarity measures.

use crate::relevance::text;
use std::collections::HashSet;
use std::hash::Hash;

/// Phrase pairs count as a match when their word sets overlap by more than this.
const PHRASE_MATCH_THRESHOLD: f64 = 0.5;

/// |A ∩ B| / |A ∪ B|; 0 when both are empty.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Cosine similarity of the binary presence vectors of two sets.
pub fn cosine<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot = a.intersection(b).count() as f64;
    dot / ((a.len() as f64).sqrt() * (b.len() as f64).sqrt())
}

/// Keyword overlap: mean of Jaccard and cosine over stop-word-filtered keyword sets.
pub fn lexical(text_a: &str, text_b: &str) -> f64 {
    let a = text::keywords(text_a);
    let b = text::keywords(text_b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (jaccard(&a, &b) + cosine(&a, &b)) / 2.0
}

fn phrases_similar(a: &str, b: &str) -> bool {
    let wa: HashSet<&str> = a.split_whitespace().collect();
    let wb: HashSet<&str> = b.split_whitespace().collect();
    if wa.is_empty() || wb.is_empty() {
        return false;
    }
    jaccard(&wa, &wb) > PHRASE_MATCH_THRESHOLD
}

/// Phrase-level overlap: mean of the bigram match ratio and concept-token Jaccard.
pub fn semantic(text_a: &str, text_b: &str) -> f64 {
    let phrases_a = text::key_phrases(text_a);
    let phrases_b = text::key_phrases(text_b);
    if phrases_a.is_empty() || phrases_b.is_empty() {
        return 0.0;
    }

    let comparisons = phrases_a.len() * phrases_b.len();
    let matches = phrases_a
        .iter()
        .flat_map(|pa| phrases_b.iter().map(move |pb| (pa, pb)))
        .filter(|(pa, pb)| phrases_similar(pa, pb))
        .count();
    let phrase_ratio = matches as f64 / comparisons as f64;

    let concept_overlap = jaccard(&text::concepts(text_a), &text::concepts(text_b));

    (phrase_ratio + concept_overlap) / 2.0
}
