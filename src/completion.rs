//! Completion Providers
//!
//! The text-completion collaborator used by the chat flow: a single
//! `complete(messages, system_prompt, options)` call. Ships with an
//! OpenAI-compatible HTTP client and a scripted client for tests and offline use.

use crate::config::CompletionConfig;
use crate::error::EngineError;
use crate::message::Role;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// One prompt message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Sampling options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: Some(2000),
        }
    }
}

impl From<&CompletionConfig> for CompletionOptions {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Text-completion collaborator
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete `messages` under `system_prompt`.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, EngineError>;

    fn model_name(&self) -> &str;
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn map_status(status: u16, detail: &str) -> EngineError {
    match status {
        401 | 403 => EngineError::CompletionAuthFailed(format!("Authentication failed: {}", detail)),
        429 => EngineError::CompletionRateLimit(format!("Rate limit exceeded: {}", detail)),
        _ => EngineError::CompletionFailed(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

fn map_http_error(error: reqwest::Error) -> EngineError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        EngineError::CompletionFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        EngineError::CompletionFailed(format!("Connection error: {}", error))
    } else {
        EngineError::CompletionFailed(format!("HTTP error: {}", error))
    }
}

/// Client for `/chat/completions` endpoints (DeepSeek, OpenAI and compatibles)
pub struct OpenAiCompatibleClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, EngineError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            EngineError::ConfigError(format!(
                "No completion API key configured (set completion.api_key or {})",
                crate::config::ENV_API_KEY
            ))
        })?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                EngineError::CompletionFailed(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, EngineError> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if !system_prompt.is_empty() {
            wire.push(WireMessage {
                role: Role::System.as_str(),
                content: system_prompt,
            });
        }
        wire.extend(messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: wire,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, messages = request.messages.len(), "Sending completion request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status.as_u16(), &error_text));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            EngineError::CompletionFailed(format!("Failed to parse response: {}", e))
        })?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngineError::CompletionFailed("No choices in response".to_string()))?;

        Ok(Completion {
            text,
            model: completion.model.unwrap_or_else(|| self.model.clone()),
            usage: completion.usage.unwrap_or_default(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Request seen by a [`ScriptedCompletion`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub system_prompt: String,
}

/// Deterministic client: replays queued replies, then echoes the last user message.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedCompletion {
    pub const MODEL: &'static str = "scripted";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(reply.into());
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

fn rough_tokens(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<Completion, EngineError> {
        self.requests.lock().push(RecordedRequest {
            messages: messages.to_vec(),
            system_prompt: system_prompt.to_string(),
        });

        let text = match self.replies.lock().pop_front() {
            Some(reply) => reply,
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map_or("", |m| m.content.as_str());
                format!("You said: {}", last_user)
            }
        };

        let prompt_tokens = rough_tokens(system_prompt)
            + messages
                .iter()
                .map(|m| rough_tokens(&m.content))
                .sum::<u32>();
        let completion_tokens = rough_tokens(&text);
        Ok(Completion {
            text,
            model: Self::MODEL.to_string(),
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }

    fn model_name(&self) -> &str {
        Self::MODEL
    }
}
