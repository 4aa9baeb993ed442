// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cognitive queue messages and their typed payloads.
//!
//! Hooks append messages with an opaque JSON payload; the payload shape is
//! fixed per message kind and parsed into a typed struct at dispatch time.
//! A payload that fails to parse marks the message failed rather than
//! poisoning the dispatch loop.

use crate::id::SessionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of work carried by a cognitive queue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A user prompt awaiting context enrichment.
    PromptContext,
    /// A tool invocation observed in the interactive session.
    ToolUse,
    /// A session lifecycle event (end, forced compaction).
    SessionEvent,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::PromptContext => write!(f, "prompt_context"),
            MessageKind::ToolUse => write!(f, "tool_use"),
            MessageKind::SessionEvent => write!(f, "session_event"),
        }
    }
}

/// Status of a message through its lifecycle.
///
/// Transitions are monotone: pending -> processing -> {completed, failed},
/// with release back to pending as the only reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Pending => write!(f, "pending"),
            MessageStatus::Processing => write!(f, "processing"),
            MessageStatus::Completed => write!(f, "completed"),
            MessageStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single work item in the cognitive queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveMessage {
    /// Monotonic id, assigned by the store at enqueue time.
    pub id: u64,
    pub session_id: SessionId,
    pub kind: MessageKind,
    /// Opaque payload, shape fixed per kind.
    pub payload: serde_json::Value,
    pub status: MessageStatus,
    pub created_at_ms: u64,
}

impl CognitiveMessage {
    /// Parse the payload of a prompt message.
    pub fn prompt_payload(&self) -> Result<PromptPayload, PayloadError> {
        self.parse(MessageKind::PromptContext)
    }

    /// Parse the payload of a tool observation.
    pub fn tool_use_payload(&self) -> Result<ToolUsePayload, PayloadError> {
        self.parse(MessageKind::ToolUse)
    }

    /// Parse the payload of a session event.
    pub fn session_event_payload(&self) -> Result<SessionEventPayload, PayloadError> {
        self.parse(MessageKind::SessionEvent)
    }

    fn parse<T: serde::de::DeserializeOwned>(
        &self,
        expected: MessageKind,
    ) -> Result<T, PayloadError> {
        if self.kind != expected {
            return Err(PayloadError::WrongKind {
                expected,
                actual: self.kind,
            });
        }
        serde_json::from_value(self.payload.clone()).map_err(PayloadError::Malformed)
    }
}

/// Errors from payload parsing.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("expected {expected} payload, message is {actual}")]
    WrongKind {
        expected: MessageKind,
        actual: MessageKind,
    },
    #[error("malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Payload of a `prompt_context` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPayload {
    pub prompt: String,
    pub prompt_fingerprint: String,
    /// Hook-side epoch millis, informational only.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Payload of a `tool_use` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsePayload {
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
    #[serde(default)]
    pub tool_response: serde_json::Value,
}

/// Payload of a `session_event` message.
///
/// Extra fields are tolerated so hooks can attach context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEventPayload {
    pub event: SessionEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    SessionEnd,
    CompactorTrigger,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
