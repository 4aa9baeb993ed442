// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between hooks and the daemon.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use engram_core::{DaemonStatus, MessageKind, RetrievalResult};
use serde::{Deserialize, Serialize};

pub use crate::protocol_wire::{
    decode, encode, read_message, read_request, write_message, write_response, ProtocolError,
    DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

/// Request from a hook to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Append a message to the cognitive queue with status pending
    Enqueue {
        kind: MessageKind,
        payload: serde_json::Value,
    },

    /// Fetch the retrieval row for a prompt fingerprint, if any
    Retrieval { fingerprint: String },

    /// Get daemon status
    Status,

    /// Request daemon shutdown (sets the state row to stopping)
    Shutdown,
}

/// Response from daemon to a hook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    Hello { version: String },

    /// Message appended; id is the queue position
    Enqueued { id: u64 },

    /// The retrieval row, absent when none exists or it has expired
    Retrieval { result: Option<RetrievalResult> },

    Status { report: StatusReport },

    ShuttingDown,

    Error { message: String },
}

/// Daemon status as seen by external tooling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusReport {
    pub session_id: String,
    pub pid: Option<u32>,
    pub status: Option<DaemonStatus>,
    pub started_at_ms: Option<u64>,
    pub last_heartbeat_at_ms: Option<u64>,
    pub pending: usize,
    pub processing: usize,
    pub retrieval_rows: usize,
    pub session_state_version: Option<u32>,
    pub retriever_busy: bool,
    pub learner_busy: bool,
    pub compactor_busy: bool,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
