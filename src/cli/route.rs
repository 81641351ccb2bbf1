//! CLI route: single route table and run context. Dispatches to the frame
//! manager and chat flow, then hands results to presentation.

use crate::chat::ChatFlow;
use crate::cli::parse::{Commands, ModeArg, OutputFormat};
use crate::cli::presentation::{
    format_context_text, format_exchange_text, format_messages_text, format_stats_text,
    format_tree_text, to_json,
};
use crate::completion::{CompletionClient, CompletionOptions, OpenAiCompatibleClient, ScriptedCompletion};
use crate::config::BranchstackConfig;
use crate::error::{EngineError, StorageError};
use crate::frame::InheritanceMode;
use crate::manager::StackManager;
use crate::metadata::{keys, Metadata};
use crate::store::SledPersistence;
use crate::types::{AgentId, MessageId, SessionId};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::info;

const SWITCH_TAIL: usize = 10;

impl From<ModeArg> for InheritanceMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::None => InheritanceMode::None,
            ModeArg::Full => InheritanceMode::Full,
            ModeArg::Selective => InheritanceMode::Selective,
            ModeArg::Summary => InheritanceMode::Summary,
        }
    }
}

/// Runtime context for CLI execution: effective config, the frame manager over
/// the sled store, and the completion client choice.
pub struct RunContext {
    config: BranchstackConfig,
    manager: Arc<StackManager>,
    offline: bool,
}

impl RunContext {
    /// Validate `config` and open the store it names.
    pub fn new(config: BranchstackConfig, offline: bool) -> Result<Self, EngineError> {
        config.ensure_valid()?;
        std::fs::create_dir_all(&config.storage.path)
            .map_err(|e| EngineError::Persistence(StorageError::IoError(e)))?;
        let store = SledPersistence::open(&config.storage.path)?;
        let manager = StackManager::new(Arc::new(store), config.engine.clone());
        info!(store = ?config.storage.path, offline, "Run context ready");
        Ok(Self {
            config,
            manager: Arc::new(manager),
            offline,
        })
    }

    pub fn manager(&self) -> &Arc<StackManager> {
        &self.manager
    }

    fn chat_flow(&self) -> Result<ChatFlow, EngineError> {
        let client: Arc<dyn CompletionClient> = if self.offline {
            Arc::new(ScriptedCompletion::new())
        } else {
            Arc::new(OpenAiCompatibleClient::new(&self.config.completion)?)
        };
        Ok(ChatFlow::new(
            Arc::clone(&self.manager),
            client,
            CompletionOptions::from(&self.config.completion),
        ))
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, EngineError> {
        match command {
            Commands::Main {
                topic,
                session,
                system_prompt,
            } => {
                let session_id = session
                    .as_deref()
                    .map(SessionId::from)
                    .unwrap_or_else(SessionId::generate);
                let mut config = Metadata::new();
                if let Some(prompt) = system_prompt {
                    config = config.with(keys::KEY_SYSTEM_PROMPT, prompt.as_str());
                }
                let agent_id = self.manager.create_main(&session_id, topic, config).await?;
                Ok(format!("Session: {}\nMain agent: {}", session_id, agent_id))
            }
            Commands::Branch {
                parent,
                topic,
                from,
                mode,
            } => {
                let parent = AgentId::from(parent.as_str());
                let trigger = match from {
                    Some(id) => MessageId::from(id.as_str()),
                    None => self.latest_message(&parent).await?,
                };
                let agent_id = self
                    .manager
                    .create_branch(&parent, topic, &trigger, (*mode).into())
                    .await?;
                Ok(format!("Branch agent: {}", agent_id))
            }
            Commands::Switch { to, from, reason } => {
                let to = AgentId::from(to.as_str());
                let from = from.as_deref().map(AgentId::from);
                self.manager.switch(from.as_ref(), &to, reason).await?;
                Ok(format!("Switched to {}", to))
            }
            Commands::Suspend { agent } => {
                let agent = AgentId::from(agent.as_str());
                self.manager.suspend(&agent).await?;
                Ok(format!("Suspended {}", agent))
            }
            Commands::Complete { agent } => {
                let agent = AgentId::from(agent.as_str());
                self.manager.complete(&agent).await?;
                Ok(format!("Completed {}", agent))
            }
            Commands::Say { agent, message } => {
                let agent = AgentId::from(agent.as_str());
                let exchange = self.chat_flow()?.send(&agent, message).await?;
                Ok(format_exchange_text(&exchange))
            }
            Commands::Chat { agent } => self.chat_loop(&AgentId::from(agent.as_str())).await,
            Commands::Context { agent, format } => {
                let context = self.manager.get_context(&AgentId::from(agent.as_str())).await?;
                Ok(match format {
                    OutputFormat::Json => to_json(&context),
                    OutputFormat::Text => format_context_text(&context),
                })
            }
            Commands::Log {
                agent,
                limit,
                format,
            } => {
                let messages = self
                    .manager
                    .conversation(&AgentId::from(agent.as_str()), *limit)
                    .await?;
                Ok(match format {
                    OutputFormat::Json => to_json(&messages),
                    OutputFormat::Text => format_messages_text(&messages),
                })
            }
            Commands::Tree { session, format } => {
                let forest = self
                    .manager
                    .session_hierarchy(&SessionId::from(session.as_str()))
                    .await?;
                Ok(match format {
                    OutputFormat::Json => to_json(&forest),
                    OutputFormat::Text => format_tree_text(&forest),
                })
            }
            Commands::Delete { agent, recursive } => {
                let removed = self
                    .manager
                    .delete_branch(&AgentId::from(agent.as_str()), *recursive)
                    .await?;
                Ok(format!("Deleted {} agent(s)", removed))
            }
            Commands::Stats { format } => {
                let stats = self.manager.memory_stats();
                Ok(match format {
                    OutputFormat::Json => to_json(&stats),
                    OutputFormat::Text => format_stats_text(
                        &stats,
                        &self.manager.active_agents(),
                        &self.manager.switch_history(SWITCH_TAIL),
                    ),
                })
            }
            Commands::Config => {
                let mut shown = self.config.clone();
                if shown.completion.api_key.is_some() {
                    shown.completion.api_key = Some("********".to_string());
                }
                toml::to_string_pretty(&shown).map_err(|e| {
                    EngineError::ConfigError(format!("Failed to render config: {}", e))
                })
            }
        }
    }

    async fn latest_message(&self, agent: &AgentId) -> Result<MessageId, EngineError> {
        self.manager
            .conversation(agent, 1)
            .await?
            .pop()
            .map(|m| m.id)
            .ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "Agent {} has no messages to branch from; pass --from",
                    agent
                ))
            })
    }

    async fn chat_loop(&self, agent: &AgentId) -> Result<String, EngineError> {
        let flow = self.chat_flow()?;
        let stdin = std::io::stdin();
        let mut turns = 0usize;
        loop {
            print!("> ");
            std::io::stdout()
                .flush()
                .map_err(|e| EngineError::Persistence(StorageError::IoError(e)))?;

            let mut line = String::new();
            let read = stdin
                .lock()
                .read_line(&mut line)
                .map_err(|e| EngineError::Persistence(StorageError::IoError(e)))?;
            let line = line.trim();
            if read == 0 || line == "/exit" {
                break;
            }
            if line.is_empty() {
                continue;
            }
            let exchange = flow.send(agent, line).await?;
            println!("{}\n", format_exchange_text(&exchange));
            turns += 1;
        }
        Ok(format!("Chat ended after {} turn(s)", turns))
    }
}
