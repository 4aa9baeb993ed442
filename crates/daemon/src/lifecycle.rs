// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup wiring and fatal-error taxonomy.
//!
//! Startup acquires the per-session lock file, recovers the store from
//! snapshot + WAL, binds the socket, and hands back the supervisor and
//! listener ready to run. Everything that can fail here is fatal (exit 1);
//! after startup the daemon degrades instead of exiting.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use engram_adapters::AgentAdapter;
use engram_core::Clock;
use engram_storage::{Gateway, GatewayError};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::listener::{ListenCtx, Listener};
use crate::supervisor::Supervisor;
use crate::workers::BusyFlags;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to acquire lock: daemon already running for this session?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("storage error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of daemon startup: the pieces the binary wires together.
#[derive(Debug)]
pub struct StartupResult<A: AgentAdapter, C: Clock> {
    /// The supervising task, ready to run.
    pub supervisor: Supervisor<A, C>,
    /// The socket listener to spawn as a task.
    pub listener: Listener<C>,
    /// Shutdown signal shared by listener, signals, and supervisor.
    pub shutdown: Arc<Notify>,
    /// Store handle for off-loop use (crash recording in the binary).
    pub gateway: Gateway<C>,
}

/// Acquire the session, recover the store, bind the socket.
pub async fn startup<A: AgentAdapter, C: Clock>(
    config: Config,
    adapter: A,
    clock: C,
) -> Result<StartupResult<A, C>, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // One daemon per session: exclusive lock with the pid inside
    let mut lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(config.lock_path())?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let gateway = Gateway::open(
        config.session_id.clone(),
        &config.wal_path(),
        &config.snapshot_path(),
        clock,
    )?;

    // A leftover socket from a dead instance would block the bind
    let socket_path = config.socket_path();
    if socket_path.exists() {
        debug!(path = %socket_path.display(), "removing stale socket file");
        let _ = std::fs::remove_file(&socket_path);
    }
    let socket = UnixListener::bind(&socket_path)
        .map_err(|e| LifecycleError::BindFailed(socket_path.clone(), e))?;

    let shutdown = Arc::new(Notify::new());
    let busy = BusyFlags::default();

    let listener = Listener::new(
        socket,
        ListenCtx {
            gateway: gateway.clone(),
            busy: busy.clone(),
            shutdown: Arc::clone(&shutdown),
        },
    );
    let supervisor = Supervisor::new(
        config,
        gateway.clone(),
        adapter,
        Arc::clone(&shutdown),
        busy,
        lock_file,
    );

    Ok(StartupResult {
        supervisor,
        listener,
        shutdown,
        gateway,
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
