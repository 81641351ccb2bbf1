//! CLI presentation: text and JSON formatters for command results.

use crate::agent::AgentStatus;
use crate::chat::ChatExchange;
use crate::frame::{FullContext, InheritedContext};
use crate::manager::{HierarchyNode, MemoryStats, SwitchRecord};
use crate::message::Message;
use crate::types::AgentId;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

const PREVIEW_CHARS: usize = 72;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn status_label(status: AgentStatus) -> String {
    match status {
        AgentStatus::Active => status.as_str().green().to_string(),
        AgentStatus::Suspended => status.as_str().yellow().to_string(),
        AgentStatus::Completed => status.as_str().dimmed().to_string(),
    }
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    }
}

fn message_table(messages: &[Message]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Time", "Role", "Message"]);
    for message in messages {
        table.add_row(vec![
            message.timestamp.format("%H:%M:%S").to_string(),
            message.role.to_string(),
            preview(&message.content),
        ]);
    }
    table
}

pub fn format_messages_text(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "No messages.".to_string();
    }
    message_table(messages).to_string()
}

pub fn format_context_text(context: &FullContext) -> String {
    let mut output = format!("{}\n", "Frame".bold().underline());
    output.push_str(&format!("  Agent:   {}\n", context.agent_id));
    if let Some(parent) = &context.parent_agent_id {
        output.push_str(&format!("  Parent:  {}\n", parent));
    }
    output.push_str(&format!("  Depth:   {}\n", context.depth));
    output.push_str(&format!("  Status:  {}\n", status_label(context.status)));
    output.push_str(&format!("  Updated: {}\n", context.updated_at.to_rfc3339()));

    output.push_str(&format!(
        "\n{} ({})\n",
        "Inherited".bold().underline(),
        context.inherited.mode()
    ));
    match &context.inherited {
        InheritedContext::None => output.push_str("  (nothing inherited)\n"),
        InheritedContext::Summary { summary, .. } => {
            for line in summary.lines() {
                output.push_str(&format!("  {}\n", line));
            }
        }
        inherited => {
            output.push_str(&format_messages_text(inherited.messages()));
            output.push('\n');
        }
    }

    output.push_str(&format!(
        "\n{} ({} messages)\n",
        "Current".bold().underline(),
        context.current.messages.len()
    ));
    output.push_str(&format_messages_text(&context.current.messages));
    output
}

pub fn format_exchange_text(exchange: &ChatExchange) -> String {
    format!(
        "{}\n\n{}",
        exchange.assistant_message.content,
        format!(
            "[{} tokens, {} ms]",
            exchange.usage.total_tokens, exchange.elapsed_ms
        )
        .dimmed()
    )
}

fn push_tree(node: &HierarchyNode, prefix: &str, last: bool, root: bool, out: &mut Vec<String>) {
    let (branch, next) = if root {
        ("", String::new())
    } else if last {
        ("└─ ", format!("{}   ", prefix))
    } else {
        ("├─ ", format!("{}│  ", prefix))
    };
    out.push(format!(
        "{}{}{} [{}] {} {}",
        prefix,
        branch,
        node.topic.bold(),
        node.kind,
        status_label(node.status),
        node.id.as_str().dimmed()
    ));
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        push_tree(child, &next, i + 1 == count, false, out);
    }
}

pub fn format_tree_text(forest: &[HierarchyNode]) -> String {
    if forest.is_empty() {
        return "No agents in this session.".to_string();
    }
    let mut lines = Vec::new();
    for root in forest {
        push_tree(root, "", true, true, &mut lines);
    }
    lines.join("\n")
}

pub fn format_stats_text(stats: &MemoryStats, active: &[AgentId], recent: &[SwitchRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Cached frames".to_string(), stats.total_frames.to_string()]);
    table.add_row(vec!["Active frames".to_string(), stats.active_frames.to_string()]);
    table.add_row(vec![
        "Suspended frames".to_string(),
        stats.suspended_frames.to_string(),
    ]);
    table.add_row(vec![
        "Switch history".to_string(),
        stats.switch_history_count.to_string(),
    ]);
    table.add_row(vec![
        "Hierarchy nodes".to_string(),
        stats.hierarchy_node_count.to_string(),
    ]);

    let mut output = table.to_string();
    if !active.is_empty() {
        output.push_str("\n\nActive agents:");
        for id in active {
            output.push_str(&format!("\n  {}", id));
        }
    }
    if !recent.is_empty() {
        output.push_str("\n\nRecent switches:");
        for record in recent {
            let from = record
                .from
                .as_ref()
                .map_or_else(|| "-".to_string(), AgentId::to_string);
            output.push_str(&format!(
                "\n  {} {} -> {} ({})",
                record.at.format("%H:%M:%S"),
                from,
                record.to,
                record.reason
            ));
        }
    }
    output
}
