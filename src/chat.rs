//! Chat Flow
//!
//! One conversational turn against an agent: record the user message, build a
//! bounded prompt from the frame's inherited bundle and its own history, call
//! the completion collaborator, then record the reply.

use crate::agent::AgentStatus;
use crate::completion::{ChatMessage, CompletionClient, CompletionOptions, TokenUsage};
use crate::error::EngineError;
use crate::frame::{FullContext, InheritedContext};
use crate::manager::StackManager;
use crate::message::{Message, Role};
use crate::metadata::{keys, Metadata};
use crate::relevance::{select_top_k, summarize};
use crate::types::AgentId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of one [`ChatFlow::send`] call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub user_message: Message,
    pub assistant_message: Message,
    pub usage: TokenUsage,
    pub elapsed_ms: u64,
}

/// Prompt assembled for a turn, before the system prompt is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptWindow {
    pub messages: Vec<ChatMessage>,
    /// Current-context messages sent verbatim
    pub context_used: usize,
}

pub struct ChatFlow {
    manager: Arc<StackManager>,
    client: Arc<dyn CompletionClient>,
    options: CompletionOptions,
}

impl ChatFlow {
    pub fn new(
        manager: Arc<StackManager>,
        client: Arc<dyn CompletionClient>,
        options: CompletionOptions,
    ) -> Self {
        Self {
            manager,
            client,
            options,
        }
    }

    pub fn manager(&self) -> &Arc<StackManager> {
        &self.manager
    }

    /// Send `content` as the user and record the model's reply.
    pub async fn send(&self, agent_id: &AgentId, content: &str) -> Result<ChatExchange, EngineError> {
        let agent = self.manager.agent(agent_id).await?;
        let context = self.manager.get_context(agent_id).await?;
        if context.status != AgentStatus::Active {
            return Err(EngineError::InvalidState(format!(
                "Agent {} is {}; switch to it before chatting",
                agent_id, context.status
            )));
        }

        let mode = context.inherited.mode();
        let user_message = self
            .manager
            .add_message(
                agent_id,
                Role::User,
                content,
                Metadata::new().with(keys::KEY_CONTEXT_MODE, mode.as_str()),
            )
            .await?;

        let context = self.manager.get_context(agent_id).await?;
        let settings = self.manager.settings();
        let window = build_prompt(
            &context,
            &agent.topic,
            settings.max_context_messages,
            settings.context_summary_length,
        );
        let system_prompt = agent
            .config
            .text(keys::KEY_SYSTEM_PROMPT)
            .map(str::to_string)
            .unwrap_or_else(|| default_system_prompt(&agent.topic));

        debug!(
            agent_id = %agent_id,
            prompt_messages = window.messages.len(),
            context_used = window.context_used,
            "Requesting completion"
        );
        let started = Instant::now();
        let completion = self
            .client
            .complete(&window.messages, &system_prompt, &self.options)
            .await?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if completion.text.trim().is_empty() {
            return Err(EngineError::CompletionFailed(
                "Completion returned no text".to_string(),
            ));
        }

        let usage = completion.usage;
        let assistant_message = self
            .manager
            .add_message(
                agent_id,
                Role::Assistant,
                &completion.text,
                keys::reply_metadata(
                    &completion.model,
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    usage.total_tokens,
                    window.context_used,
                ),
            )
            .await?;

        info!(
            agent_id = %agent_id,
            model = %completion.model,
            total_tokens = usage.total_tokens,
            elapsed_ms,
            "Chat turn completed"
        );
        Ok(ChatExchange {
            user_message,
            assistant_message,
            usage,
            elapsed_ms,
        })
    }
}

/// Topic-focused default used when the agent config carries no `system_prompt`.
pub fn default_system_prompt(topic: &str) -> String {
    format!(
        "You are a focused assistant for the topic \"{}\". Stay on this topic, \
         build on the context you have been given, and keep answers concise.",
        topic
    )
}

/// Assemble the prompt for a turn.
///
/// Inherited messages come first (reduced with [`select_top_k`] when they
/// outgrow the window) or the inherited digest as a system message. Then the
/// newest `window` current messages, with anything older condensed into one
/// system summary of at most `summary_len` characters.
pub fn build_prompt(
    context: &FullContext,
    topic: &str,
    window: usize,
    summary_len: usize,
) -> PromptWindow {
    let mut messages = Vec::new();

    match &context.inherited {
        InheritedContext::None => {}
        InheritedContext::Summary { summary, .. } => {
            messages.push(ChatMessage::new(
                Role::System,
                format!("Context from the parent conversation:\n{}", summary),
            ));
        }
        inherited => {
            let source = inherited.messages();
            let picked = if source.len() > window {
                select_top_k(source, topic, window)
            } else {
                source.to_vec()
            };
            messages.extend(picked.into_iter().map(to_chat));
        }
    }

    let current = &context.current.messages;
    let split = current.len().saturating_sub(window);
    let (older, recent) = current.split_at(split);
    if !older.is_empty() {
        messages.push(ChatMessage::new(
            Role::System,
            format!("Earlier in this conversation: {}", summarize(older, topic, summary_len)),
        ));
    }
    messages.extend(recent.iter().cloned().map(to_chat));

    PromptWindow {
        messages,
        context_used: recent.len(),
    }
}

fn to_chat(message: Message) -> ChatMessage {
    ChatMessage {
        role: message.role,
        content: message.content,
    }
}
