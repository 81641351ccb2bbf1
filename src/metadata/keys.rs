//! Well-known metadata keys and builders for the write paths that use them.

use crate::frame::InheritanceMode;
use crate::metadata::value::Metadata;
use crate::types::MessageId;

pub const KEY_BRANCH_FROM_MESSAGE: &str = "branch_from_message";
pub const KEY_INHERITANCE_MODE: &str = "inheritance_mode";
pub const KEY_SYSTEM_PROMPT: &str = "system_prompt";
pub const KEY_CONTEXT_MODE: &str = "context_mode";
pub const KEY_MODEL: &str = "model";
pub const KEY_TOKENS: &str = "tokens";
pub const KEY_BRANCHABLE: &str = "branchable";
pub const KEY_CONTEXT_USED: &str = "context_used";

/// Config recorded on a branch agent and its frame.
pub fn branch_config(trigger_message: &MessageId, mode: InheritanceMode) -> Metadata {
    Metadata::new()
        .with(KEY_BRANCH_FROM_MESSAGE, trigger_message.as_str())
        .with(KEY_INHERITANCE_MODE, mode.as_str())
}

/// Metadata stamped on an assistant reply produced by the chat flow.
pub fn reply_metadata(
    model: &str,
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
    context_used: usize,
) -> Metadata {
    let tokens = Metadata::new()
        .with("prompt_tokens", prompt_tokens)
        .with("completion_tokens", completion_tokens)
        .with("total_tokens", total_tokens);
    Metadata::new()
        .with(KEY_MODEL, model)
        .with(KEY_TOKENS, tokens)
        .with(KEY_BRANCHABLE, true)
        .with(KEY_CONTEXT_USED, context_used)
}
