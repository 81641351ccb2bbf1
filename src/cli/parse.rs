//! CLI parse: clap types for branchstack. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Branchstack CLI - branching conversations with inherited context
#[derive(Parser, Debug)]
#[command(name = "branchstack")]
#[command(about = "Branching conversational agents backed by a stack of context frames")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where branchstack.toml is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides storage.path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Answer with the scripted client instead of the configured provider
    #[arg(long)]
    pub offline: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Output format for read commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Inheritance mode accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    None,
    Full,
    Selective,
    Summary,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the main agent for a session
    Main {
        /// Topic of the conversation
        topic: String,
        /// Session id (generated when omitted)
        #[arg(long)]
        session: Option<String>,
        /// System prompt recorded in the agent config
        #[arg(long)]
        system_prompt: Option<String>,
    },
    /// Fork a branch agent from a parent
    Branch {
        /// Parent agent id
        parent: String,
        /// Topic of the branch
        topic: String,
        /// Message the branch forks from (defaults to the parent's latest message)
        #[arg(long)]
        from: Option<String>,
        /// Inheritance mode
        #[arg(long, value_enum, default_value = "selective")]
        mode: ModeArg,
    },
    /// Activate an agent, suspending another
    Switch {
        /// Agent to activate
        to: String,
        /// Agent to suspend
        #[arg(long)]
        from: Option<String>,
        /// Reason recorded in the switch history
        #[arg(long, default_value = "manual")]
        reason: String,
    },
    /// Suspend an agent
    Suspend {
        agent: String,
    },
    /// Mark an agent completed (irreversible)
    Complete {
        agent: String,
    },
    /// Send one message and print the reply
    Say {
        agent: String,
        message: String,
    },
    /// Interactive chat on stdin; `/exit` or EOF ends the session
    Chat {
        agent: String,
    },
    /// Show an agent's frame: current and inherited context
    Context {
        agent: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show an agent's stored conversation
    Log {
        agent: String,
        /// Newest messages to show (0 = all)
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the agent tree of a session
    Tree {
        session: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Delete an agent, with its subtree when --recursive
    Delete {
        agent: String,
        #[arg(long)]
        recursive: bool,
    },
    /// Show frame manager statistics
    Stats {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the effective configuration as TOML
    Config,
}
