// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state built by applying events in order.
//!
//! # Idempotency Requirement
//!
//! All event handlers MUST be idempotent: applying the same event twice must
//! produce the same state as applying it once. Events may be re-applied
//! during WAL replay after a crash between append and snapshot. Guidelines:
//! guard inserts with existence checks, guard status changes with transition
//! checks, use assignment instead of mutation.

use engram_core::{
    CognitiveMessage, DaemonStatus, Event, MessageStatus, OrchestratorState, RetrievalResult,
    SessionId, SessionState, RELEVANCE_HIT, RELEVANCE_NONE, RETRIEVAL_TTL_MS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Materialized store state for one user session.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    /// The session every row in this store belongs to.
    pub session_id: SessionId,
    /// Next cognitive message id to assign (ids are monotonic from 1).
    pub next_message_id: u64,
    /// Cognitive queue, keyed by id (iteration order is claim order).
    pub messages: BTreeMap<u64, CognitiveMessage>,
    /// Retrieval queue rows, in write order.
    pub retrievals: Vec<RetrievalResult>,
    /// The per-session daemon state row.
    pub orchestrator: Option<OrchestratorState>,
    /// Compaction documents, in version order.
    pub session_states: Vec<SessionState>,
}

impl MaterializedState {
    pub fn for_session(session_id: SessionId) -> Self {
        Self {
            session_id,
            next_message_id: 1,
            ..Self::default()
        }
    }

    /// Pending messages in id order, up to `limit`.
    pub fn pending_in_order(&self, limit: usize) -> Vec<CognitiveMessage> {
        self.messages
            .values()
            .filter(|m| m.status == MessageStatus::Pending)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Ids of messages still pending or processing.
    pub fn inflight_ids(&self) -> Vec<u64> {
        self.messages
            .values()
            .filter(|m| {
                matches!(
                    m.status,
                    MessageStatus::Pending | MessageStatus::Processing
                )
            })
            .map(|m| m.id)
            .collect()
    }

    pub fn count_with_status(&self, status: MessageStatus) -> usize {
        self.messages.values().filter(|m| m.status == status).count()
    }

    /// Most recent un-expired retrieval row for a fingerprint.
    pub fn latest_retrieval(&self, fingerprint: &str, now_ms: u64) -> Option<&RetrievalResult> {
        self.retrievals
            .iter()
            .rev()
            .find(|r| r.prompt_fingerprint == fingerprint && !r.is_expired(now_ms))
    }

    pub fn latest_session_state(&self) -> Option<&SessionState> {
        self.session_states.last()
    }

    /// Apply an event to derive state changes.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::MessageEnqueued {
                id,
                kind,
                payload,
                created_at_ms,
            } => {
                // Idempotency: skip if the id already exists
                if !self.messages.contains_key(id) {
                    self.messages.insert(
                        *id,
                        CognitiveMessage {
                            id: *id,
                            session_id: self.session_id.clone(),
                            kind: *kind,
                            payload: payload.clone(),
                            status: MessageStatus::Pending,
                            created_at_ms: *created_at_ms,
                        },
                    );
                }
                self.next_message_id = self.next_message_id.max(id + 1);
            }

            Event::MessageClaimed { id } => {
                if let Some(msg) = self.messages.get_mut(id) {
                    if msg.status == MessageStatus::Pending {
                        msg.status = MessageStatus::Processing;
                    }
                }
            }

            Event::MessageCompleted { id } => {
                if let Some(msg) = self.messages.get_mut(id) {
                    if msg.status == MessageStatus::Processing {
                        msg.status = MessageStatus::Completed;
                    }
                }
            }

            Event::MessageFailed { id } => {
                if let Some(msg) = self.messages.get_mut(id) {
                    if matches!(
                        msg.status,
                        MessageStatus::Pending | MessageStatus::Processing
                    ) {
                        msg.status = MessageStatus::Failed;
                    }
                }
            }

            Event::MessageReleased { id } => {
                if let Some(msg) = self.messages.get_mut(id) {
                    if msg.status == MessageStatus::Processing {
                        msg.status = MessageStatus::Pending;
                    }
                }
            }

            Event::RetrievalWritten {
                prompt_fingerprint,
                context_type,
                text,
                created_at_ms,
            } => {
                // Idempotency: one row per (fingerprint, created_at)
                let exists = self.retrievals.iter().any(|r| {
                    r.prompt_fingerprint == *prompt_fingerprint
                        && r.created_at_ms == *created_at_ms
                });
                if !exists {
                    let relevance_score = if text.is_some() {
                        RELEVANCE_HIT
                    } else {
                        RELEVANCE_NONE
                    };
                    self.retrievals.push(RetrievalResult {
                        session_id: self.session_id.clone(),
                        prompt_fingerprint: prompt_fingerprint.clone(),
                        context_type: *context_type,
                        context: text.clone(),
                        relevance_score,
                        created_at_ms: *created_at_ms,
                        expires_at_ms: created_at_ms + RETRIEVAL_TTL_MS,
                    });
                }
            }

            Event::RetrievalsPruned { now_ms } => {
                self.retrievals.retain(|r| !r.is_expired(*now_ms));
            }

            Event::DaemonStarting {
                pid,
                retriever_on,
                learner_on,
                compactor_on,
                started_at_ms,
            } => {
                self.orchestrator = Some(OrchestratorState {
                    session_id: self.session_id.clone(),
                    pid: *pid,
                    status: DaemonStatus::Starting,
                    retriever_enabled: *retriever_on,
                    learner_enabled: *learner_on,
                    compactor_enabled: *compactor_on,
                    retriever_session: None,
                    learner_session: None,
                    started_at_ms: *started_at_ms,
                    last_heartbeat_at_ms: *started_at_ms,
                    stopped_at_ms: None,
                    error: None,
                });
            }

            Event::DaemonRunning {
                retriever_session,
                learner_session,
            } => {
                if let Some(row) = self.orchestrator.as_mut() {
                    row.status = DaemonStatus::Running;
                    row.retriever_session = retriever_session.clone();
                    row.learner_session = learner_session.clone();
                }
            }

            Event::HeartbeatTouched { at_ms } => {
                if let Some(row) = self.orchestrator.as_mut() {
                    row.last_heartbeat_at_ms = *at_ms;
                }
            }

            Event::DaemonStopping => {
                if let Some(row) = self.orchestrator.as_mut() {
                    if row.status.is_active() {
                        row.status = DaemonStatus::Stopping;
                    }
                }
            }

            Event::DaemonStopped { at_ms } => {
                if let Some(row) = self.orchestrator.as_mut() {
                    row.status = DaemonStatus::Stopped;
                    row.stopped_at_ms = Some(*at_ms);
                }
            }

            Event::DaemonCrashed { error, at_ms } => {
                if let Some(row) = self.orchestrator.as_mut() {
                    row.status = DaemonStatus::Crashed;
                    row.error = Some(error.clone());
                    row.stopped_at_ms = Some(*at_ms);
                }
            }

            Event::CompactionWritten {
                version,
                project_slug,
                state_text,
                tail_path,
                token_estimate,
                created_at_ms,
            } => {
                // Idempotency: versions are unique per session
                if !self.session_states.iter().any(|s| s.version == *version) {
                    self.session_states.push(SessionState {
                        session_id: self.session_id.clone(),
                        project_slug: project_slug.clone(),
                        state_text: state_text.clone(),
                        tail_path: tail_path.clone(),
                        token_estimate: *token_estimate,
                        version: *version,
                        created_at_ms: *created_at_ms,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
