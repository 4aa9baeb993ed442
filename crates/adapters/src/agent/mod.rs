// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runtime adapters
//!
//! The `AgentAdapter` trait is the orchestrator's only view of the external
//! agent runtime: start a persistent session per role, resume it with the
//! next user message, get back the terminal result with its cost. The
//! session handle is an opaque token whose lifetime equals the daemon's;
//! prior turns are never inspected.

mod claude;
mod stream;

pub use claude::{ClaudeAgentAdapter, ClaudeConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AgentCall, FakeAgentAdapter};

use async_trait::async_trait;
use engram_core::{AgentSessionId, Role};
use thiserror::Error;

/// Errors from agent operations.
///
/// `Err` means the call itself broke (launch, stream, timeout). An agent
/// that ran but reported failure comes back as `Ok` with
/// [`ReplyOutcome::Error`].
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to launch agent: {0}")]
    SpawnFailed(String),
    #[error("agent call failed: {0}")]
    CallFailed(String),
    #[error("agent stream ended without a result message")]
    MissingResult,
    #[error("agent session not established: {0}")]
    NoSession(String),
}

/// Per-call tuning: each role sets its own caps.
#[derive(Debug, Clone)]
pub struct CallLimits {
    /// Tools the agent may call during this invocation.
    pub tool_allowlist: Vec<String>,
    pub model: String,
    pub max_turns: u32,
    /// Spend ceiling for one call, in USD. The runtime has no cost flag, so
    /// the adapter checks the reported cost afterwards and warns on overrun.
    pub budget_usd: f64,
}

/// Configuration for initializing a role's persistent session.
#[derive(Debug, Clone)]
pub struct InitSessionConfig {
    pub system_prompt: String,
    pub limits: CallLimits,
}

/// Terminal outcome of one agent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Success,
    Error,
}

/// The terminal result of one resumed call.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub outcome: ReplyOutcome,
    pub text: String,
    pub cost_usd: f64,
}

impl AgentReply {
    pub fn is_success(&self) -> bool {
        self.outcome == ReplyOutcome::Success
    }
}

/// Uniform facade over the agent execution runtime.
#[async_trait]
pub trait AgentAdapter: Clone + Send + Sync + 'static {
    /// Start a fresh persistent session for a role.
    ///
    /// The initialization message is the system prompt plus a fixed
    /// readiness probe; the returned handle resumes the same conversation
    /// on every later call.
    async fn init_session(
        &self,
        role: Role,
        config: InitSessionConfig,
    ) -> Result<AgentSessionId, AgentError>;

    /// Resume a session with one user message and stream to the terminal
    /// result.
    async fn resume(
        &self,
        handle: &AgentSessionId,
        user_message: &str,
        limits: &CallLimits,
    ) -> Result<AgentReply, AgentError>;
}
