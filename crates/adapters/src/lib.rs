// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters over external collaborators: the agent execution runtime.

pub mod agent;
pub mod subprocess;

pub use agent::{
    AgentAdapter, AgentError, AgentReply, CallLimits, ClaudeAgentAdapter, ClaudeConfig,
    InitSessionConfig, ReplyOutcome,
};

#[cfg(any(test, feature = "test-support"))]
pub use agent::{AgentCall, FakeAgentAdapter};
