// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compactor worker: periodically folds the transcript into a versioned
//! session-state document.
//!
//! Timer-driven, not queue-driven: every tick the transcript size is turned
//! into a token estimate and a run happens only when enough new tokens
//! accumulated since the last compaction. A `compactor_trigger` session
//! event forces a run regardless of the threshold. The token cursor only
//! advances after a successful persist, so failures retry on the next tick.

use super::transcript;
use engram_adapters::{AgentAdapter, CallLimits};
use engram_core::AgentSessionId;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// New-token threshold for a scheduled run.
pub(crate) const TOKEN_THRESHOLD: u64 = 20_000;

/// Minimum result length worth persisting.
const MIN_STATE_CHARS: usize = 50;

const MAX_TURNS: u32 = 3;
const BUDGET_USD: f64 = 0.50;
const MODEL: &str = "sonnet";

pub(crate) const SYSTEM_PROMPT: &str = "\
You maintain the session-state document for an AI coding assistant. From \
transcript excerpts you produce a structured markdown document with these \
sections: Goal, Decisions (append-only), Completed (append-only), Current \
State, Next Steps, Open Questions. Keep it dense and factual; drop \
pleasantries and tool noise. Reply with the full document only.";

pub(crate) fn limits() -> CallLimits {
    CallLimits {
        tool_allowlist: Vec::new(),
        model: MODEL.to_string(),
        max_turns: MAX_TURNS,
        budget_usd: BUDGET_USD,
    }
}

/// First compaction: only the window.
pub(crate) fn compose_initial(window_text: &str) -> String {
    format!(
        "Produce the initial session-state document from this transcript \
         excerpt:\n\n{window_text}"
    )
}

/// Later compactions: previous document plus the new window. Append-only
/// sections grow; volatile sections are replaced.
pub(crate) fn compose_update(previous_state: &str, window_text: &str) -> String {
    format!(
        "Update the session-state document. Append new entries to the \
         append-only sections (Decisions, Completed) and replace the volatile \
         sections (Current State, Next Steps, Open Questions).\n\n\
         Previous document:\n{previous_state}\n\n\
         New transcript excerpt:\n{window_text}"
    )
}

/// Successful run: the document plus what to persist alongside it.
#[derive(Debug)]
pub(crate) struct CompactionOutcome {
    pub state_text: String,
    pub tail_text: String,
    pub token_estimate: u64,
}

/// A run that produced nothing to persist. The cursor does not advance.
#[derive(Debug)]
pub(crate) enum CompactionSkip {
    EmptyTranscript,
    ResultTooShort,
    AgentFailed(String),
}

impl std::fmt::Display for CompactionSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompactionSkip::EmptyTranscript => write!(f, "no conversational content"),
            CompactionSkip::ResultTooShort => write!(f, "agent produced no usable document"),
            CompactionSkip::AgentFailed(e) => write!(f, "agent call failed: {e}"),
        }
    }
}

/// Trigger bookkeeping owned by the supervisor.
#[derive(Debug)]
pub(crate) struct Compactor {
    enabled: bool,
    transcript_path: Option<PathBuf>,
    last_compacted_tokens: u64,
    busy: Arc<AtomicBool>,
    missing_logged: bool,
}

impl Compactor {
    pub fn new(
        enabled: bool,
        transcript_path: Option<PathBuf>,
        last_compacted_tokens: u64,
        busy: Arc<AtomicBool>,
    ) -> Self {
        Self {
            enabled,
            transcript_path,
            last_compacted_tokens,
            busy,
            missing_logged: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    /// Advance the cursor after a successful persist.
    pub fn advance(&mut self, token_estimate: u64) {
        self.last_compacted_tokens = token_estimate;
    }

    /// Decide whether to run now; returns the transcript path and the
    /// current token estimate.
    pub fn plan_run(&mut self, force: bool) -> Option<(PathBuf, u64)> {
        if !self.enabled || self.is_busy() {
            return None;
        }
        let path = self.transcript_path.clone()?;
        let file_len = match std::fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(_) => {
                if !self.missing_logged {
                    info!(path = %path.display(), "transcript not found; compactor idle");
                    self.missing_logged = true;
                }
                return None;
            }
        };
        self.missing_logged = false;

        let estimate = transcript::estimate_tokens(file_len);
        if force || estimate.saturating_sub(self.last_compacted_tokens) >= TOKEN_THRESHOLD {
            Some((path, estimate))
        } else {
            None
        }
    }
}

/// One compaction run: extract, window, prompt, persist-or-skip.
pub(crate) async fn run<A: AgentAdapter>(
    adapter: A,
    handle: AgentSessionId,
    transcript_path: &Path,
    previous_state: Option<String>,
    token_estimate: u64,
) -> Result<CompactionOutcome, CompactionSkip> {
    let chunks = transcript::extract_chunks(transcript_path)
        .map_err(|e| CompactionSkip::AgentFailed(format!("transcript read: {e}")))?;
    if chunks.is_empty() {
        return Err(CompactionSkip::EmptyTranscript);
    }

    let window = transcript::window_chunks(&chunks, transcript::WINDOW_CHAR_BUDGET);
    let window_text = transcript::render_chunks(window);
    let tail_text = transcript::tail_snapshot(window);

    let message = match &previous_state {
        Some(previous) => compose_update(previous, &window_text),
        None => compose_initial(&window_text),
    };

    let reply = adapter
        .resume(&handle, &message, &limits())
        .await
        .map_err(|e| CompactionSkip::AgentFailed(e.to_string()))?;
    if !reply.is_success() {
        return Err(CompactionSkip::AgentFailed(reply.text));
    }

    let state_text = reply.text.trim().to_string();
    if state_text.chars().count() < MIN_STATE_CHARS {
        return Err(CompactionSkip::ResultTooShort);
    }

    Ok(CompactionOutcome {
        state_text,
        tail_text,
        token_estimate,
    })
}

#[cfg(test)]
#[path = "compactor_tests.rs"]
mod tests;
