// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor loop: owns the daemon lifecycle and dispatches queue work.
//!
//! One task drives three periodic activities (queue polling, heartbeat,
//! compactor checks) plus worker completions, all through `tokio::select!`.
//! Store and sliding-window writes happen only here; worker tasks run the
//! agent calls and report back over a channel. Per-role mutual exclusion is
//! a single-slot busy flag per role; the retriever and learner may be
//! active at the same time.

use crate::config::Config;
use crate::lifecycle::LifecycleError;
use crate::workers::{
    compactor::{self, CompactionOutcome, CompactionSkip, Compactor},
    learner, retriever, BusyFlags, RoleSlot, WorkerDone,
};
use engram_adapters::{AgentAdapter, InitSessionConfig};
use engram_core::{
    Clock, CognitiveMessage, ContextType, DaemonStatus, MessageKind, Role, SessionEventKind,
    SlidingWindow,
};
use engram_storage::Gateway;
use std::fs::File;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// FIFO claim batch size per poll.
const CLAIM_BATCH: usize = 10;

/// Worker completion channel depth.
const WORKER_CHANNEL_CAPACITY: usize = 16;

enum Flow {
    Continue,
    Stop,
}

/// The daemon's supervising task.
#[derive(Debug)]
pub struct Supervisor<A: AgentAdapter, C: Clock> {
    config: Config,
    gateway: Gateway<C>,
    adapter: A,
    window: SlidingWindow,
    retriever: RoleSlot,
    learner: RoleSlot,
    compactor: Compactor,
    compactor_handle: Option<engram_core::AgentSessionId>,
    worker_tx: mpsc::Sender<WorkerDone>,
    worker_rx: mpsc::Receiver<WorkerDone>,
    shutdown: Arc<Notify>,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl<A: AgentAdapter, C: Clock> Supervisor<A, C> {
    pub(crate) fn new(
        config: Config,
        gateway: Gateway<C>,
        adapter: A,
        shutdown: Arc<Notify>,
        busy: BusyFlags,
        lock_file: File,
    ) -> Self {
        let (worker_tx, worker_rx) = mpsc::channel(WORKER_CHANNEL_CAPACITY);
        let compactor = Compactor::new(
            config.compactor_on,
            config.transcript_path.clone(),
            config.last_compact_tokens,
            busy.compactor,
        );
        Self {
            retriever: RoleSlot::new(Role::Retriever, config.retriever_on, busy.retriever),
            learner: RoleSlot::new(Role::Learner, config.learner_on, busy.learner),
            compactor,
            compactor_handle: None,
            window: SlidingWindow::new(),
            config,
            gateway,
            adapter,
            worker_tx,
            worker_rx,
            shutdown,
            lock_file,
        }
    }

    /// Run until shutdown. Errors are fatal startup failures only; the main
    /// loop degrades and retries instead of exiting.
    pub async fn run(mut self) -> Result<(), LifecycleError> {
        self.init_roles().await?;
        self.main_loop().await;
        self.teardown().await;
        Ok(())
    }

    /// Startup registration: state row, then the enabled roles' agent
    /// sessions concurrently. A role that fails to initialize is disabled;
    /// the daemon still runs.
    async fn init_roles(&mut self) -> Result<(), LifecycleError> {
        self.gateway.upsert_state_start(
            std::process::id(),
            self.retriever.enabled,
            self.learner.enabled,
            self.config.compactor_on,
        )?;

        let adapter = self.adapter.clone();
        let init = move |role: Role, enabled: bool, system_prompt: &'static str, limits| {
            let adapter = adapter.clone();
            async move {
                if !enabled {
                    return None;
                }
                Some(
                    adapter
                        .init_session(
                            role,
                            InitSessionConfig {
                                system_prompt: system_prompt.to_string(),
                                limits,
                            },
                        )
                        .await,
                )
            }
        };

        let (retriever_init, learner_init, compactor_init) = tokio::join!(
            init(
                Role::Retriever,
                self.retriever.enabled,
                retriever::SYSTEM_PROMPT,
                retriever::limits()
            ),
            init(
                Role::Learner,
                self.learner.enabled,
                learner::SYSTEM_PROMPT,
                learner::limits()
            ),
            init(
                Role::Compactor,
                self.config.compactor_on && self.config.transcript_path.is_some(),
                compactor::SYSTEM_PROMPT,
                compactor::limits()
            ),
        );

        match retriever_init {
            Some(Ok(handle)) => self.retriever.handle = Some(handle),
            Some(Err(e)) => {
                error!(error = %e, "retriever session init failed; role disabled");
                self.retriever.enabled = false;
            }
            None => {}
        }
        match learner_init {
            Some(Ok(handle)) => self.learner.handle = Some(handle),
            Some(Err(e)) => {
                error!(error = %e, "learner session init failed; role disabled");
                self.learner.enabled = false;
            }
            None => {}
        }
        match compactor_init {
            Some(Ok(handle)) => self.compactor_handle = Some(handle),
            Some(Err(e)) => {
                error!(error = %e, "compactor session init failed; role disabled");
            }
            None => {}
        }

        self.gateway.update_state_running(
            self.retriever.handle.clone(),
            self.learner.handle.clone(),
        )?;
        info!(session_id = %self.config.session_id, "daemon running");
        Ok(())
    }

    async fn main_loop(&mut self) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        let mut compact = tokio::time::interval(self.config.compact_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        compact.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The receiver and the shutdown signal move into locals so the
        // select arms never hold a borrow of self across a handler.
        let shutdown = Arc::clone(&self.shutdown);
        let mut worker_rx = std::mem::replace(&mut self.worker_rx, mpsc::channel(1).1);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if matches!(self.poll_once(), Flow::Stop) {
                        break;
                    }
                }

                _ = heartbeat.tick() => {
                    if let Err(e) = self.gateway.touch_heartbeat() {
                        warn!(error = %e, "heartbeat write failed");
                    }
                }

                _ = compact.tick() => {
                    self.maybe_compact(false);
                }

                Some(done) = worker_rx.recv() => {
                    self.handle_worker_done(done);
                }

                _ = shutdown.notified() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }
    }

    /// One poll cycle: claim a FIFO batch and dispatch in id order.
    fn poll_once(&mut self) -> Flow {
        if self.gateway.lookup_status() == Some(DaemonStatus::Stopping) {
            info!("state row set to stopping; shutting down");
            return Flow::Stop;
        }

        if let Err(e) = self.gateway.prune_expired_retrievals() {
            warn!(error = %e, "retrieval prune failed");
        }

        let batch = match self.gateway.claim_pending(CLAIM_BATCH) {
            Ok(batch) => batch,
            Err(e) => {
                // Transient store failure: the next poll retries
                warn!(error = %e, "queue claim failed");
                return Flow::Continue;
            }
        };

        for msg in batch {
            match msg.kind {
                MessageKind::PromptContext => self.dispatch_prompt(msg),
                MessageKind::ToolUse => self.dispatch_tool_use(msg),
                MessageKind::SessionEvent => {
                    if matches!(self.dispatch_session_event(msg), Flow::Stop) {
                        return Flow::Stop;
                    }
                }
            }
        }
        Flow::Continue
    }

    fn dispatch_prompt(&mut self, msg: CognitiveMessage) {
        let payload = match msg.prompt_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(id = msg.id, error = %e, "malformed prompt payload");
                let _ = self.gateway.mark_failed(msg.id);
                return;
            }
        };

        // A hook is waiting on this fingerprint either way: a disabled
        // retriever still answers none so it never hangs.
        if !self.retriever.is_ready() {
            self.write_none(&payload.prompt_fingerprint);
            let _ = self.gateway.mark_completed(msg.id);
            return;
        }

        if !self.retriever.try_acquire() {
            debug!(
                id = msg.id,
                fingerprint = %payload.prompt_fingerprint,
                "retriever mid-flight; answering none immediately"
            );
            self.write_none(&payload.prompt_fingerprint);
            let _ = self.gateway.mark_completed(msg.id);
            return;
        }

        let Some(handle) = self.retriever.handle.clone() else {
            self.retriever.release();
            self.write_none(&payload.prompt_fingerprint);
            let _ = self.gateway.mark_completed(msg.id);
            return;
        };

        self.window.push_user(payload.prompt.clone());
        let message = retriever::compose_message(&payload.prompt, &self.window.format());
        let task = retriever::spawn_call(
            self.adapter.clone(),
            handle,
            message,
            msg.id,
            payload.prompt_fingerprint,
            self.worker_tx.clone(),
        );
        self.retriever.task = Some(task);
    }

    fn dispatch_tool_use(&mut self, msg: CognitiveMessage) {
        let payload = match msg.tool_use_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(id = msg.id, error = %e, "malformed tool observation");
                let _ = self.gateway.mark_failed(msg.id);
                return;
            }
        };

        if !self.learner.is_ready() {
            debug!(id = msg.id, "learner unavailable; dropping observation");
            let _ = self.gateway.mark_completed(msg.id);
            return;
        }

        // Knowledge extraction is deferrable: a busy learner releases the
        // observation back to pending rather than losing it.
        if !self.learner.try_acquire() {
            debug!(id = msg.id, "learner busy; releasing observation to pending");
            let _ = self.gateway.release_to_pending(msg.id);
            return;
        }

        let Some(handle) = self.learner.handle.clone() else {
            self.learner.release();
            let _ = self.gateway.release_to_pending(msg.id);
            return;
        };

        let message = learner::compose_message(&payload);
        let task = learner::spawn_call(
            self.adapter.clone(),
            handle,
            message,
            msg.id,
            self.worker_tx.clone(),
        );
        self.learner.task = Some(task);
    }

    fn dispatch_session_event(&mut self, msg: CognitiveMessage) -> Flow {
        let payload = match msg.session_event_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(id = msg.id, error = %e, "malformed session event");
                let _ = self.gateway.mark_failed(msg.id);
                return Flow::Continue;
            }
        };

        match payload.event {
            SessionEventKind::SessionEnd => {
                info!(id = msg.id, "session end; shutting down");
                let _ = self.gateway.mark_completed(msg.id);
                let _ = self.gateway.mark_stopping();
                Flow::Stop
            }
            SessionEventKind::CompactorTrigger => {
                let _ = self.gateway.mark_completed(msg.id);
                self.maybe_compact(true);
                Flow::Continue
            }
        }
    }

    /// Start a compaction run when the trigger rule (or a forced trigger)
    /// says so and the slot is free.
    fn maybe_compact(&mut self, force: bool) {
        let Some(handle) = self.compactor_handle.clone() else {
            return;
        };
        let Some((path, estimate)) = self.compactor.plan_run(force) else {
            return;
        };
        self.compactor.set_busy(true);

        let previous = self.gateway.latest_session_state().map(|s| s.state_text);
        let adapter = self.adapter.clone();
        let tx = self.worker_tx.clone();
        tokio::spawn(async move {
            let outcome = compactor::run(adapter, handle, &path, previous, estimate).await;
            let _ = tx.send(WorkerDone::Compactor { outcome }).await;
        });
    }

    fn handle_worker_done(&mut self, done: WorkerDone) {
        match done {
            WorkerDone::Retriever {
                message_id,
                fingerprint,
                reply,
            } => {
                self.retriever.release();
                match reply {
                    Ok(reply) if reply.is_success() => {
                        match retriever::classify(&reply.text) {
                            retriever::ReplyClass::Context => {
                                let text = reply.text.trim().to_string();
                                self.window.push_summary(retriever::summary(&text));
                                if let Err(e) = self.gateway.write_retrieval(
                                    &fingerprint,
                                    ContextType::MemoryResults,
                                    Some(text),
                                ) {
                                    warn!(error = %e, "retrieval write failed");
                                }
                                debug!(
                                    fingerprint = %fingerprint,
                                    cost_usd = reply.cost_usd,
                                    "context retrieved"
                                );
                            }
                            retriever::ReplyClass::Skip => {
                                self.write_none(&fingerprint);
                            }
                        }
                        let _ = self.gateway.mark_completed(message_id);
                    }
                    Ok(reply) => {
                        // The hook always finds a row, even on agent failure
                        warn!(error = %reply.text, "retriever agent reported failure");
                        self.write_none(&fingerprint);
                        let _ = self.gateway.mark_failed(message_id);
                    }
                    Err(e) => {
                        warn!(error = %e, "retriever call failed");
                        self.write_none(&fingerprint);
                        let _ = self.gateway.mark_failed(message_id);
                    }
                }
            }

            WorkerDone::Learner { message_id, reply } => {
                self.learner.release();
                match reply {
                    Ok(reply) if reply.is_success() => {
                        if let Some(summary) = learner::summary(&reply.text) {
                            self.window.push_summary(summary);
                        }
                        let _ = self.gateway.mark_completed(message_id);
                    }
                    Ok(reply) => {
                        warn!(error = %reply.text, "learner agent reported failure");
                        let _ = self.gateway.mark_failed(message_id);
                    }
                    Err(e) => {
                        warn!(error = %e, "learner call failed");
                        let _ = self.gateway.mark_failed(message_id);
                    }
                }
            }

            WorkerDone::Compactor { outcome } => {
                self.compactor.set_busy(false);
                match outcome {
                    Ok(outcome) => self.persist_compaction(outcome),
                    Err(CompactionSkip::EmptyTranscript) => {
                        debug!("compaction skipped: empty transcript")
                    }
                    Err(skip) => warn!(reason = %skip, "compaction failed; will retry"),
                }
            }
        }
    }

    /// Tail file first, then the row; the token cursor advances only after
    /// both succeed.
    fn persist_compaction(&mut self, outcome: CompactionOutcome) {
        let version = self
            .gateway
            .latest_session_state()
            .map(|s| s.version + 1)
            .unwrap_or(1);
        let tail_path = self.config.tail_path(version);

        if let Some(parent) = tail_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(error = %e, "tail directory create failed; will retry");
                return;
            }
        }
        if let Err(e) = std::fs::write(&tail_path, &outcome.tail_text) {
            warn!(error = %e, "tail write failed; will retry");
            return;
        }

        match self.gateway.insert_session_state(
            &self.config.project_slug,
            &outcome.state_text,
            &tail_path,
            outcome.token_estimate,
        ) {
            Ok(version) => {
                info!(
                    version,
                    token_estimate = outcome.token_estimate,
                    "session state compacted"
                );
                self.compactor.advance(outcome.token_estimate);
            }
            Err(e) => warn!(error = %e, "session state insert failed; will retry"),
        }
    }

    fn write_none(&self, fingerprint: &str) {
        if let Err(e) = self
            .gateway
            .write_retrieval(fingerprint, ContextType::None, None)
        {
            warn!(error = %e, "retrieval write failed");
        }
    }

    /// Graceful teardown, bounded by the shutdown grace period. The store
    /// work runs on a blocking thread; if it overruns, the daemon exits
    /// anyway and the next instance recovers from WAL.
    async fn teardown(&mut self) {
        self.retriever.abort_inflight();
        self.learner.abort_inflight();

        let gateway = self.gateway.clone();
        let socket_path = self.config.socket_path();
        let lock_path = self.config.lock_path();
        let work = tokio::task::spawn_blocking(move || {
            let _ = gateway.mark_stopping();
            if let Err(e) = gateway.mark_stopped() {
                warn!(error = %e, "failed to mark state row stopped");
            }
            match gateway.fail_inflight() {
                Ok(swept) if swept > 0 => info!(swept, "swept in-flight messages to failed"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "in-flight sweep failed"),
            }
            if let Err(e) = gateway.snapshot() {
                warn!(error = %e, "shutdown snapshot failed");
            }
            let _ = std::fs::remove_file(socket_path);
            let _ = std::fs::remove_file(lock_path);
        });

        match tokio::time::timeout(self.config.shutdown_grace, work).await {
            Ok(_) => info!("daemon stopped"),
            Err(_) => warn!("teardown exceeded grace period; exiting anyway"),
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
