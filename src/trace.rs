use std::path::Path;

use anyhow::{Context, bail};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::agent::types::{Message, Role, Tool};

const ELAPSED_TIME_PRECISION: usize = 2;

/// Transcript of one turn
#[derive(Serialize)]
pub struct TraceEntry {
    /// When the turn started
    pub started_at: DateTime<Local>,
    /// Model that served the turn
    pub model: String,
    /// Time taken by the turn in seconds
    pub elapsed_secs: f64,
    /// Tool rounds run before the final answer; absent when the turn failed
    pub rounds: Option<usize>,
    /// Final assistant reply, or the error that ended the turn
    pub outcome: String,
    /// Tool definitions available to the agent
    pub tools: Vec<Tool>,
    /// Conversation messages between agent and tools
    pub messages: Vec<Message>,
}

/// Write the trace as JSON or Markdown depending on the file extension
pub fn write_trace(path: &str, entry: &TraceEntry) -> anyhow::Result<()> {
    let content = match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(entry)?,
        Some("md") => format_trace_markdown(entry),
        _ => bail!("Trace file must end with .md or .json"),
    };

    std::fs::write(path, content).with_context(|| format!("Failed to write trace file {}", path))?;
    info!("Trace written to {}", path);
    Ok(())
}

/// Format a turn as Markdown with model details, tools and agent messages
pub fn format_trace_markdown(entry: &TraceEntry) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "# Turn: {}\n\n",
        entry.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("**Model:** {}\n\n", entry.model));
    output.push_str(&format!(
        "**Elapsed:** {:.prec$}s\n\n",
        entry.elapsed_secs,
        prec = ELAPSED_TIME_PRECISION
    ));
    if let Some(rounds) = entry.rounds {
        output.push_str(&format!("**Tool rounds:** {}\n\n", rounds));
    }

    output.push_str("## Outcome\n\n");
    let backticks = get_fence_backticks(&entry.outcome);
    output.push_str(&format!(
        "{}markdown\n{}\n{}\n\n",
        backticks,
        entry.outcome.trim(),
        backticks
    ));

    output.push_str("## Tools\n\n");
    let tools_json = serde_json::to_string_pretty(&entry.tools).unwrap_or_default();
    output.push_str(&format!("```json\n{}\n```\n\n", tools_json));

    output.push_str("## Messages\n\n");
    for (i, msg) in entry.messages.iter().enumerate() {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        output.push_str(&format!("### Message {} - Role: {}\n\n", i + 1, role));

        if let Some(id) = &msg.tool_call_id {
            output.push_str(&format!("**Tool Call ID:** {}\n\n", id));
        }

        if let Some(content) = msg.content.as_deref().filter(|c| !c.is_empty()) {
            let backticks = get_fence_backticks(content);
            match msg.role {
                Role::Tool => {
                    output.push_str(&format!("{}json\n{}\n{}\n\n", backticks, content, backticks))
                }
                Role::System | Role::User => output.push_str(&format!(
                    "{}markdown\n{}\n{}\n\n",
                    backticks, content, backticks
                )),
                Role::Assistant => output.push_str(&format!("{}\n\n", content)),
            }
        }

        let tool_calls = msg.requested_tool_calls();
        if !tool_calls.is_empty() {
            output.push_str("**Tool Calls:**\n\n");
            for tc in tool_calls {
                let formatted_args = serde_json::from_str::<serde_json::Value>(&tc.function.arguments)
                    .and_then(|v| serde_json::to_string_pretty(&v))
                    .unwrap_or_else(|_| tc.function.arguments.clone());
                let backticks = get_fence_backticks(&formatted_args);
                output.push_str(&format!(
                    "- **{}** ({})\n\n{}json\n{}\n{}\n\n",
                    tc.function.name, tc.id, backticks, formatted_args, backticks
                ));
            }
        }
    }
    output
}

/// Get appropriate number of backticks for Markdown code fence
/// Returns at least 3 backticks, or more if content contains backtick sequences
fn get_fence_backticks(content: &str) -> String {
    const MIN_BACKTICKS: usize = 3;
    let max_backticks = content
        .as_bytes()
        .split(|&b| b != b'`')
        .filter(|s| !s.is_empty())
        .map(|s| s.len())
        .max()
        .unwrap_or(0);
    "`".repeat((max_backticks + 1).max(MIN_BACKTICKS))
}
