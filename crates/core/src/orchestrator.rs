// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-session daemon state row.

use crate::id::{AgentSessionId, SessionId};
use serde::{Deserialize, Serialize};

/// A daemon is alive iff running and heartbeat is younger than this window.
pub const LIVENESS_WINDOW_MS: u64 = 120_000;

/// Lifecycle status of a daemon instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Crashed,
}

impl std::fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonStatus::Starting => write!(f, "starting"),
            DaemonStatus::Running => write!(f, "running"),
            DaemonStatus::Stopping => write!(f, "stopping"),
            DaemonStatus::Stopped => write!(f, "stopped"),
            DaemonStatus::Crashed => write!(f, "crashed"),
        }
    }
}

impl DaemonStatus {
    /// Whether this status marks a live (or would-be live) instance.
    pub fn is_active(&self) -> bool {
        matches!(self, DaemonStatus::Starting | DaemonStatus::Running)
    }
}

/// Single row per session tracking the daemon instance that owns it.
///
/// At most one row with an active status exists per session id: a new
/// instance reaps a stale predecessor to `crashed` before upserting itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub session_id: SessionId,
    pub pid: u32,
    pub status: DaemonStatus,
    pub retriever_enabled: bool,
    pub learner_enabled: bool,
    pub compactor_enabled: bool,
    pub retriever_session: Option<AgentSessionId>,
    pub learner_session: Option<AgentSessionId>,
    pub started_at_ms: u64,
    pub last_heartbeat_at_ms: u64,
    pub stopped_at_ms: Option<u64>,
    pub error: Option<String>,
}

impl OrchestratorState {
    /// Liveness check used for stale-row reaping.
    pub fn is_alive(&self, now_ms: u64) -> bool {
        self.status == DaemonStatus::Running
            && now_ms.saturating_sub(self.last_heartbeat_at_ms) < LIVENESS_WINDOW_MS
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
