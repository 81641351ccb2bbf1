//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; a single route table dispatches to the frame
//! manager and chat flow.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, ModeArg, OutputFormat};
pub use presentation::{
    format_context_text, format_exchange_text, format_messages_text, format_stats_text,
    format_tree_text, status_label,
};
pub use route::RunContext;
