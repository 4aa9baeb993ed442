// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Learner worker: extracts durable knowledge from tool observations.
//!
//! Knowledge extraction is deferrable: when the slot is occupied the
//! observation is released back to pending instead of dropped, and a later
//! poll re-claims it. The agent persists findings through its own tool
//! calls; nothing is written to the retrieval queue from this path.

use super::{truncate_chars, WorkerDone};
use engram_adapters::{AgentAdapter, CallLimits};
use engram_core::{AgentSessionId, ToolUsePayload};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) const SYSTEM_PROMPT: &str = "\
You are the memory learner for an AI coding assistant. You observe tool \
invocations from the user's session. Decide whether an observation carries \
durable knowledge: an error with its resolution, a non-obvious command, a \
reusable pattern. If it does, look up what is already stored, avoid \
duplicates, and save it with your tools, then reply with one sentence \
describing what you saved. If the observation is trivial, reply with the \
single word SKIP.";

/// Looser turn cap: lookup, dedup, and save may be separate turns.
const MAX_TURNS: u32 = 8;
const BUDGET_USD: f64 = 0.25;
const MODEL: &str = "haiku";

/// Upper bound on tool input/response text in the agent prompt.
const OBSERVATION_CHAR_LIMIT: usize = 2_000;

/// Window summary length for a learner reply.
const SUMMARY_CHARS: usize = 100;

pub(crate) fn limits() -> CallLimits {
    CallLimits {
        tool_allowlist: vec![
            "mcp__memory__search_memory".to_string(),
            "mcp__memory__search_errors".to_string(),
            "mcp__memory__save_learning".to_string(),
            "mcp__memory__save_error".to_string(),
            "mcp__memory__save_pattern".to_string(),
        ],
        model: MODEL.to_string(),
        max_turns: MAX_TURNS,
        budget_usd: BUDGET_USD,
    }
}

/// Render a payload value as prompt text.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Structured agent message: tool name, truncated input and response, SKIP
/// directive.
pub(crate) fn compose_message(payload: &ToolUsePayload) -> String {
    let input = value_text(&payload.tool_input);
    let response = value_text(&payload.tool_response);
    format!(
        "Tool observation from the session:\n\
         Tool: {}\n\
         Input:\n{}\n\
         Response:\n{}\n\n\
         Save durable knowledge if present. Reply SKIP if trivial.",
        payload.tool_name,
        truncate_chars(&input, OBSERVATION_CHAR_LIMIT),
        truncate_chars(&response, OBSERVATION_CHAR_LIMIT),
    )
}

/// Short window entry for a learner reply; None when there is nothing
/// worth tracing.
pub(crate) fn summary(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.to_uppercase() == "SKIP" {
        return None;
    }
    Some(truncate_chars(trimmed, SUMMARY_CHARS).to_string())
}

/// Run one learner call off the supervisor task.
pub(crate) fn spawn_call<A: AgentAdapter>(
    adapter: A,
    handle: AgentSessionId,
    message: String,
    message_id: u64,
    tx: mpsc::Sender<WorkerDone>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reply = adapter.resume(&handle, &message, &limits()).await;
        let _ = tx.send(WorkerDone::Learner { message_id, reply }).await;
    })
}

#[cfg(test)]
#[path = "learner_tests.rs"]
mod tests;
