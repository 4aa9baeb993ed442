// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retriever worker: answers each prompt with stored context or "none".
//!
//! The prompt hook waits on a short deadline, so this path never blocks on
//! a busy slot: a mid-flight retriever answers "none" immediately and the
//! hook proceeds without enrichment.

use super::{truncate_chars, WorkerDone};
use engram_adapters::{AgentAdapter, CallLimits};
use engram_core::AgentSessionId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) const SYSTEM_PROMPT: &str = "\
You are the memory retriever for an AI coding assistant. For each incoming \
prompt, search the knowledge base with your tools for prior learnings, error \
solutions, and reusable patterns that bear on it. Reply with a short, dense \
digest of what you found, quoting concrete details. If nothing stored is \
relevant, reply with the single word SKIP. Never ask questions.";

/// Tight turn cap: the hook is waiting.
const MAX_TURNS: u32 = 5;
const BUDGET_USD: f64 = 0.10;
const MODEL: &str = "haiku";

/// Replies shorter than this carry no usable context.
const MIN_CONTEXT_CHARS: usize = 20;

/// Window summary length for a successful retrieval.
const SUMMARY_CHARS: usize = 100;

pub(crate) fn limits() -> CallLimits {
    CallLimits {
        tool_allowlist: vec![
            "mcp__memory__search_memory".to_string(),
            "mcp__memory__search_errors".to_string(),
            "mcp__memory__search_patterns".to_string(),
        ],
        model: MODEL.to_string(),
        max_turns: MAX_TURNS,
        budget_usd: BUDGET_USD,
    }
}

/// Agent user message: the new prompt, the window transcript, and the SKIP
/// directive.
pub(crate) fn compose_message(prompt: &str, window_transcript: &str) -> String {
    format!(
        "New prompt from the user:\n{prompt}\n\n\
         Recent session activity:\n{window_transcript}\n\n\
         Search the knowledge base for context relevant to this prompt. \
         Reply SKIP if nothing relevant is known."
    )
}

/// Classification of the agent's reply.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReplyClass {
    Context,
    Skip,
}

/// Empty, literal SKIP, or too short to be useful all classify as skip.
pub(crate) fn classify(text: &str) -> ReplyClass {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || trimmed.to_uppercase() == "SKIP"
        || trimmed.chars().count() < MIN_CONTEXT_CHARS
    {
        ReplyClass::Skip
    } else {
        ReplyClass::Context
    }
}

/// Short window entry summarizing a successful retrieval.
pub(crate) fn summary(text: &str) -> String {
    truncate_chars(text.trim(), SUMMARY_CHARS).to_string()
}

/// Run one retrieval call off the supervisor task.
pub(crate) fn spawn_call<A: AgentAdapter>(
    adapter: A,
    handle: AgentSessionId,
    message: String,
    message_id: u64,
    fingerprint: String,
    tx: mpsc::Sender<WorkerDone>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reply = adapter.resume(&handle, &message, &limits()).await;
        let _ = tx
            .send(WorkerDone::Retriever {
                message_id,
                fingerprint,
                reply,
            })
            .await;
    })
}

#[cfg(test)]
#[path = "retriever_tests.rs"]
mod tests;
