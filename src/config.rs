//! Configuration System
//!
//! Layered configuration for the engine, the sled store, the completion
//! provider and logging. Layers, lowest to highest: built-in defaults, the
//! global config file, the workspace `branchstack.toml`, then
//! `BRANCHSTACK__SECTION__KEY` environment variables.

use crate::error::EngineError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod loader;
mod merge;
mod sources;

pub use loader::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Environment variable consulted when no API key is configured.
pub const ENV_API_KEY: &str = "BRANCHSTACK_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchstackConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Frame manager limits and chat context sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deepest allowed branch; the main agent sits at depth 0
    #[serde(default = "default_max_stack_depth")]
    pub max_stack_depth: u32,

    /// Advisory cap on active frames before eviction kicks in
    #[serde(default = "default_max_active_frames")]
    pub max_active_frames: usize,

    /// Current-context messages sent verbatim with each chat turn
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,

    /// Character budget for generated summaries
    #[serde(default = "default_context_summary_length")]
    pub context_summary_length: usize,
}

fn default_max_stack_depth() -> u32 {
    5
}

fn default_max_active_frames() -> usize {
    10
}

fn default_max_context_messages() -> usize {
    10
}

fn default_context_summary_length() -> usize {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: default_max_stack_depth(),
            max_active_frames: default_max_active_frames(),
            max_context_messages: default_max_context_messages(),
            context_summary_length: default_context_summary_length(),
        }
    }
}

/// Sled store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "branchstack")
        .map(|dirs| dirs.data_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from(".branchstack").join("store"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to `BRANCHSTACK_API_KEY` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl CompletionConfig {
    /// Configured key, or the `BRANCHSTACK_API_KEY` environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty()))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Engine(String),
    Storage(String),
    Completion(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Engine(msg) => write!(f, "engine: {}", msg),
            ValidationError::Storage(msg) => write!(f, "storage: {}", msg),
            ValidationError::Completion(msg) => write!(f, "completion: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

const MIN_SUMMARY_LENGTH: usize = 16;

impl BranchstackConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let engine = &self.engine;
        if engine.max_stack_depth < 1 {
            errors.push(ValidationError::Engine(
                "max_stack_depth must be at least 1".to_string(),
            ));
        }
        if engine.max_active_frames < 1 {
            errors.push(ValidationError::Engine(
                "max_active_frames must be at least 1".to_string(),
            ));
        }
        if engine.max_context_messages < 1 {
            errors.push(ValidationError::Engine(
                "max_context_messages must be at least 1".to_string(),
            ));
        }
        if engine.context_summary_length < MIN_SUMMARY_LENGTH {
            errors.push(ValidationError::Engine(format!(
                "context_summary_length must be at least {}",
                MIN_SUMMARY_LENGTH
            )));
        }

        if self.storage.path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "Store path cannot be empty".to_string(),
            ));
        }

        if self.completion.model.trim().is_empty() {
            errors.push(ValidationError::Completion(
                "model cannot be empty".to_string(),
            ));
        }
        if !(self.completion.base_url.starts_with("http://")
            || self.completion.base_url.starts_with("https://"))
        {
            errors.push(ValidationError::Completion(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.completion.base_url
            )));
        }

        if !matches!(self.logging.format.as_str(), "json" | "text") {
            errors.push(ValidationError::Logging(format!(
                "format must be 'json' or 'text', got '{}'",
                self.logging.format
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// [`validate`](Self::validate), folded into a single engine error.
    pub fn ensure_valid(&self) -> Result<(), EngineError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            EngineError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }
}
