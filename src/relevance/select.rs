//! Top-k message selection.

use crate::message::Message;
use crate::relevance;

const RELEVANCE_WEIGHT: f64 = 0.6;
const RECENCY_WEIGHT: f64 = 0.3;
const USER_BONUS: f64 = 0.1;

/// Pick the `k` best messages for `topic`, returned in their original order.
///
/// Each message is scored against the messages before it, blended with a
/// linear recency weight and a flat bonus for user-authored turns. Ties keep
/// the earlier message. When `messages.len() <= k` everything is returned.
pub fn select_top_k(messages: &[Message], topic: &str, k: usize) -> Vec<Message> {
    if messages.len() <= k {
        return messages.to_vec();
    }

    let len = messages.len() as f64;
    let mut ranked: Vec<(usize, f64)> = messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let relevance = relevance::score(&message.content, topic, Some(&messages[..index]));
            let recency = (index + 1) as f64 / len;
            let bonus = if message.is_user() { USER_BONUS } else { 0.0 };
            (index, relevance * RELEVANCE_WEIGHT + recency * RECENCY_WEIGHT + bonus)
        })
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked.sort_by_key(|(index, _)| *index);

    ranked
        .into_iter()
        .map(|(index, _)| messages[index].clone())
        .collect()
}
