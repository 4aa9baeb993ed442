// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events that mutate the persisted store.
//!
//! Every store mutation is expressed as an event, appended to the WAL before
//! it is applied, so state is recoverable via snapshot + replay.
//!
//! Serializes with `{"type": "area:verb", ...fields}` format.

use crate::id::AgentSessionId;
use crate::message::MessageKind;
use crate::retrieval::ContextType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- cognitive queue --
    #[serde(rename = "queue:enqueued")]
    MessageEnqueued {
        id: u64,
        kind: MessageKind,
        payload: serde_json::Value,
        created_at_ms: u64,
    },

    #[serde(rename = "queue:claimed")]
    MessageClaimed { id: u64 },

    #[serde(rename = "queue:completed")]
    MessageCompleted { id: u64 },

    #[serde(rename = "queue:failed")]
    MessageFailed { id: u64 },

    /// Reversal of a claim: the message goes back to pending for a later
    /// poll (used when the learner slot is occupied).
    #[serde(rename = "queue:released")]
    MessageReleased { id: u64 },

    // -- retrieval queue --
    #[serde(rename = "retrieval:written")]
    RetrievalWritten {
        prompt_fingerprint: String,
        context_type: ContextType,
        text: Option<String>,
        created_at_ms: u64,
    },

    /// Drops rows whose expiry has passed. Consumers already treat expired
    /// rows as absent; this keeps the store from accumulating them.
    #[serde(rename = "retrieval:pruned")]
    RetrievalsPruned { now_ms: u64 },

    // -- daemon state row --
    #[serde(rename = "daemon:starting")]
    DaemonStarting {
        pid: u32,
        retriever_on: bool,
        learner_on: bool,
        compactor_on: bool,
        started_at_ms: u64,
    },

    #[serde(rename = "daemon:running")]
    DaemonRunning {
        retriever_session: Option<AgentSessionId>,
        learner_session: Option<AgentSessionId>,
    },

    #[serde(rename = "daemon:heartbeat")]
    HeartbeatTouched { at_ms: u64 },

    #[serde(rename = "daemon:stopping")]
    DaemonStopping,

    #[serde(rename = "daemon:stopped")]
    DaemonStopped { at_ms: u64 },

    #[serde(rename = "daemon:crashed")]
    DaemonCrashed { error: String, at_ms: u64 },

    // -- session state --
    #[serde(rename = "compaction:written")]
    CompactionWritten {
        version: u32,
        project_slug: String,
        state_text: String,
        tail_path: PathBuf,
        token_estimate: u64,
        created_at_ms: u64,
    },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
