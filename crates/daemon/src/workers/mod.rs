// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker roles and their shared plumbing.
//!
//! Each role is a single-slot executor: at most one in-flight agent call at
//! any instant, guarded by an atomic busy flag acquired with compare-and-set
//! from the supervisor's dispatch path. Workers run as spawned tasks and
//! report back over a channel; all store and window writes stay on the
//! supervisor task.

pub(crate) mod compactor;
pub(crate) mod learner;
pub(crate) mod retriever;
pub(crate) mod transcript;

use engram_adapters::{AgentError, AgentReply};
use engram_core::{AgentSessionId, Role};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Completion message sent from a worker task to the supervisor.
pub(crate) enum WorkerDone {
    Retriever {
        message_id: u64,
        fingerprint: String,
        reply: Result<AgentReply, AgentError>,
    },
    Learner {
        message_id: u64,
        reply: Result<AgentReply, AgentError>,
    },
    Compactor {
        outcome: Result<compactor::CompactionOutcome, compactor::CompactionSkip>,
    },
}

/// Busy flags shared with the listener for status reporting.
#[derive(Clone, Default)]
#[derive(Debug)]
pub(crate) struct BusyFlags {
    pub retriever: Arc<AtomicBool>,
    pub learner: Arc<AtomicBool>,
    pub compactor: Arc<AtomicBool>,
}

/// One role's single in-flight slot.
#[derive(Debug)]
pub(crate) struct RoleSlot {
    pub role: Role,
    pub enabled: bool,
    pub handle: Option<AgentSessionId>,
    pub task: Option<JoinHandle<()>>,
    busy: Arc<AtomicBool>,
}

impl RoleSlot {
    pub fn new(role: Role, enabled: bool, busy: Arc<AtomicBool>) -> Self {
        Self {
            role,
            enabled,
            handle: None,
            task: None,
            busy,
        }
    }

    /// Enabled and holding a live agent session.
    pub fn is_ready(&self) -> bool {
        self.enabled && self.handle.is_some()
    }

    /// Claim the slot; false means a call is already in flight.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn release(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
        self.task = None;
    }

    pub fn abort_inflight(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::debug!(role = %self.role, "aborting in-flight agent call");
            task.abort();
        }
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Truncate on a char boundary, appending no marker. Tool output and
/// transcripts can hold multi-byte text, so byte slicing is not safe here.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn slot_acquire_is_exclusive() {
        let mut slot = RoleSlot::new(Role::Retriever, true, Arc::default());
        assert!(slot.try_acquire());
        assert!(!slot.try_acquire());
        slot.release();
        assert!(slot.try_acquire());
    }

    #[test]
    fn disabled_slot_is_never_ready() {
        let mut slot = RoleSlot::new(Role::Learner, false, Arc::default());
        slot.handle = Some(AgentSessionId::new("h"));
        assert!(!slot.is_ready());
    }
}
