// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed facade over the store: queue claims, retrieval writes, the daemon
//! state row, and session-state documents.
//!
//! Every mutation appends its event to the WAL (durably) and applies it to
//! the materialized state under a single lock, so multi-step operations like
//! claiming a batch are atomic with respect to concurrent callers. The
//! listener and the supervisor each hold a clone.

use crate::{MaterializedState, Snapshot, SnapshotError, Wal, WalError};
use engram_core::{
    AgentSessionId, Clock, CognitiveMessage, ContextType, DaemonStatus, Event, MessageKind,
    MessageStatus, OrchestratorState, RetrievalResult, SessionId, SessionState, SystemClock,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Errors from gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug)]
struct Inner {
    wal: Wal,
    state: MaterializedState,
}

/// Shared handle to the per-session store.
#[derive(Debug)]
pub struct Gateway<C: Clock = SystemClock> {
    inner: Arc<Mutex<Inner>>,
    session_id: SessionId,
    snapshot_path: PathBuf,
    clock: C,
}

impl<C: Clock> Clone for Gateway<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            session_id: self.session_id.clone(),
            snapshot_path: self.snapshot_path.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Point-in-time view for status reporting.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub row: Option<OrchestratorState>,
    pub pending: usize,
    pub processing: usize,
    pub retrieval_rows: usize,
    pub session_state_version: Option<u32>,
}

impl<C: Clock> Gateway<C> {
    /// Open the store: load the snapshot if present, replay the WAL tail.
    pub fn open(
        session_id: SessionId,
        wal_path: &Path,
        snapshot_path: &Path,
        clock: C,
    ) -> Result<Self, GatewayError> {
        let (snapshot_seq, mut state) = match Snapshot::load(snapshot_path)? {
            Some(snapshot) => (snapshot.seq, snapshot.state),
            None => (0, MaterializedState::for_session(session_id.clone())),
        };

        let (wal, replay) = Wal::open(wal_path, snapshot_seq)?;
        if !replay.is_empty() {
            debug!(entries = replay.len(), "replaying WAL tail");
        }
        for entry in &replay {
            state.apply_event(&entry.event);
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { wal, state })),
            session_id,
            snapshot_path: snapshot_path.to_owned(),
            clock,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Append the event durably, then apply it. Caller holds the lock.
    fn emit(inner: &mut Inner, event: Event) -> Result<(), GatewayError> {
        inner.wal.append(&event)?;
        inner.wal.flush()?;
        inner.state.apply_event(&event);
        Ok(())
    }

    // ── cognitive queue ──────────────────────────────────────────────────────

    /// Append a message with status pending; returns its id.
    pub fn enqueue(
        &self,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> Result<u64, GatewayError> {
        let mut inner = self.inner.lock();
        let id = inner.state.next_message_id.max(1);
        Self::emit(
            &mut inner,
            Event::MessageEnqueued {
                id,
                kind,
                payload,
                created_at_ms: self.clock.epoch_ms(),
            },
        )?;
        Ok(id)
    }

    /// Atomically claim up to `limit` pending messages in id order,
    /// flipping them to processing.
    ///
    /// No message is ever returned twice: the flip happens under the same
    /// lock as the selection. On a mid-batch write failure the rows already
    /// flipped are released again so nothing is left stuck in processing.
    pub fn claim_pending(&self, limit: usize) -> Result<Vec<CognitiveMessage>, GatewayError> {
        let mut inner = self.inner.lock();
        let batch = inner.state.pending_in_order(limit);
        let mut claimed: Vec<CognitiveMessage> = Vec::with_capacity(batch.len());
        for msg in batch {
            if let Err(e) = Self::emit(&mut inner, Event::MessageClaimed { id: msg.id }) {
                for prior in &claimed {
                    let _ = Self::emit(&mut inner, Event::MessageReleased { id: prior.id });
                }
                return Err(e);
            }
            claimed.push(CognitiveMessage {
                status: MessageStatus::Processing,
                ..msg
            });
        }
        Ok(claimed)
    }

    pub fn mark_completed(&self, id: u64) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(&mut inner, Event::MessageCompleted { id })
    }

    pub fn mark_failed(&self, id: u64) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(&mut inner, Event::MessageFailed { id })
    }

    pub fn release_to_pending(&self, id: u64) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(&mut inner, Event::MessageReleased { id })
    }

    /// Sweep every pending or processing message to failed (shutdown path).
    pub fn fail_inflight(&self) -> Result<usize, GatewayError> {
        let mut inner = self.inner.lock();
        let ids = inner.state.inflight_ids();
        for id in &ids {
            Self::emit(&mut inner, Event::MessageFailed { id: *id })?;
        }
        Ok(ids.len())
    }

    // ── retrieval queue ──────────────────────────────────────────────────────

    /// Write exactly one retrieval row for a prompt fingerprint.
    ///
    /// Relevance is 0.8 when text is present, 0.0 otherwise; the row expires
    /// 60 seconds after creation.
    pub fn write_retrieval(
        &self,
        prompt_fingerprint: &str,
        context_type: ContextType,
        text: Option<String>,
    ) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(
            &mut inner,
            Event::RetrievalWritten {
                prompt_fingerprint: prompt_fingerprint.to_string(),
                context_type,
                text,
                created_at_ms: self.clock.epoch_ms(),
            },
        )
    }

    /// Most recent un-expired retrieval row for a fingerprint.
    pub fn latest_retrieval(&self, fingerprint: &str) -> Option<RetrievalResult> {
        let inner = self.inner.lock();
        inner
            .state
            .latest_retrieval(fingerprint, self.clock.epoch_ms())
            .cloned()
    }

    /// Drop expired retrieval rows. No-op (and no WAL entry) when none are
    /// expired.
    pub fn prune_expired_retrievals(&self) -> Result<(), GatewayError> {
        let now_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        if inner.state.retrievals.iter().any(|r| r.is_expired(now_ms)) {
            Self::emit(&mut inner, Event::RetrievalsPruned { now_ms })?;
        }
        Ok(())
    }

    // ── daemon state row ─────────────────────────────────────────────────────

    /// Upsert the state row for a starting instance.
    ///
    /// A leftover active row belongs to a predecessor that never cleaned up
    /// (the lock file forbids two live instances on one session); it is
    /// reaped to crashed before the fresh row is written.
    pub fn upsert_state_start(
        &self,
        pid: u32,
        retriever_on: bool,
        learner_on: bool,
        compactor_on: bool,
    ) -> Result<(), GatewayError> {
        let now_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        if let Some(row) = inner.state.orchestrator.as_ref() {
            if row.status.is_active() {
                warn!(
                    stale_pid = row.pid,
                    "reaping stale daemon state row to crashed"
                );
                Self::emit(
                    &mut inner,
                    Event::DaemonCrashed {
                        error: format!("reaped by pid {pid}: heartbeat went stale"),
                        at_ms: now_ms,
                    },
                )?;
            }
        }
        Self::emit(
            &mut inner,
            Event::DaemonStarting {
                pid,
                retriever_on,
                learner_on,
                compactor_on,
                started_at_ms: now_ms,
            },
        )
    }

    pub fn update_state_running(
        &self,
        retriever_session: Option<AgentSessionId>,
        learner_session: Option<AgentSessionId>,
    ) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(
            &mut inner,
            Event::DaemonRunning {
                retriever_session,
                learner_session,
            },
        )
    }

    pub fn touch_heartbeat(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(
            &mut inner,
            Event::HeartbeatTouched {
                at_ms: self.clock.epoch_ms(),
            },
        )
    }

    pub fn mark_stopping(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(&mut inner, Event::DaemonStopping)
    }

    pub fn mark_stopped(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(
            &mut inner,
            Event::DaemonStopped {
                at_ms: self.clock.epoch_ms(),
            },
        )
    }

    pub fn mark_crashed(&self, error: &str) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        Self::emit(
            &mut inner,
            Event::DaemonCrashed {
                error: error.to_string(),
                at_ms: self.clock.epoch_ms(),
            },
        )
    }

    pub fn lookup_status(&self) -> Option<DaemonStatus> {
        self.inner.lock().state.orchestrator.as_ref().map(|r| r.status)
    }

    pub fn state_row(&self) -> Option<OrchestratorState> {
        self.inner.lock().state.orchestrator.clone()
    }

    /// Point-in-time status for the listener's report.
    pub fn status_snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        StatusSnapshot {
            row: inner.state.orchestrator.clone(),
            pending: inner.state.count_with_status(MessageStatus::Pending),
            processing: inner.state.count_with_status(MessageStatus::Processing),
            retrieval_rows: inner.state.retrievals.len(),
            session_state_version: inner.state.latest_session_state().map(|s| s.version),
        }
    }

    // ── session state ────────────────────────────────────────────────────────

    pub fn latest_session_state(&self) -> Option<SessionState> {
        self.inner.lock().state.latest_session_state().cloned()
    }

    /// Insert the next session-state version (contiguous from 1).
    pub fn insert_session_state(
        &self,
        project_slug: &str,
        state_text: &str,
        tail_path: &Path,
        token_estimate: u64,
    ) -> Result<u32, GatewayError> {
        let mut inner = self.inner.lock();
        let version = inner
            .state
            .latest_session_state()
            .map(|s| s.version + 1)
            .unwrap_or(1);
        Self::emit(
            &mut inner,
            Event::CompactionWritten {
                version,
                project_slug: project_slug.to_string(),
                state_text: state_text.to_string(),
                tail_path: tail_path.to_owned(),
                token_estimate,
                created_at_ms: self.clock.epoch_ms(),
            },
        )?;
        Ok(version)
    }

    // ── persistence ──────────────────────────────────────────────────────────

    /// Write a durable snapshot and truncate the WAL behind it.
    pub fn snapshot(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.last_seq();
        if seq == 0 {
            return Ok(());
        }
        Snapshot::new(seq, inner.state.clone()).save(&self.snapshot_path)?;
        inner.wal.truncate_through(seq)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
