// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned session-state documents produced by the compactor.

use crate::id::SessionId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One compaction of the session transcript.
///
/// Versions per session are contiguous starting at 1; the latest row is the
/// document a fresh context is seeded from after a reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: SessionId,
    pub project_slug: String,
    pub state_text: String,
    /// Raw conversational tail written alongside the structured document.
    pub tail_path: PathBuf,
    /// Cumulative transcript token estimate at the time of this compaction.
    pub token_estimate: u64,
    pub version: u32,
    pub created_at_ms: u64,
}
