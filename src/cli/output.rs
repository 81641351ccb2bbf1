//! CLI output: error mapping from engine errors to stable CLI messages.

use crate::error::EngineError;

/// Map engine errors to a one-line message plus a hint where one helps.
pub fn map_error(e: &EngineError) -> String {
    match e {
        EngineError::NotFound(_) => format!("{}\nHint: list agents with `branchstack tree <session>`", e),
        EngineError::DepthExceeded { .. } => {
            format!("{}\nHint: branch from a shallower agent", e)
        }
        EngineError::CompletionAuthFailed(_) => format!(
            "{}\nHint: set completion.api_key or {}",
            e,
            crate::config::ENV_API_KEY
        ),
        _ => format!("Error: {}", e),
    }
}
