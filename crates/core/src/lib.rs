// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! engram-core: domain types for the engram memory sidecar

pub mod clock;
pub mod event;
pub mod id;
pub mod message;
pub mod orchestrator;
pub mod retrieval;
pub mod role;
pub mod session_state;
pub mod window;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::Event;
pub use id::{AgentSessionId, SessionId, ShortId};
pub use message::{
    CognitiveMessage, MessageKind, MessageStatus, PayloadError, PromptPayload, SessionEventKind,
    SessionEventPayload, ToolUsePayload,
};
pub use orchestrator::{DaemonStatus, OrchestratorState, LIVENESS_WINDOW_MS};
pub use retrieval::{
    ContextType, RetrievalResult, RELEVANCE_HIT, RELEVANCE_NONE, RETRIEVAL_TTL_MS,
};
pub use role::Role;
pub use session_state::SessionState;
pub use window::{SlidingWindow, WindowEntry, WindowRole};
