// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! engram daemon (engramd)
//!
//! Cognitive memory sidecar for one interactive assistant session: enriches
//! prompts from the knowledge base, extracts durable learnings from tool
//! activity, and compacts the transcript into a session-state document.
//!
//! Architecture:
//! - Listener task: socket I/O for the hooks (enqueue, retrieval, status)
//! - Supervisor loop: queue dispatch, heartbeat, compaction timers

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use engram_adapters::{ClaudeAgentAdapter, ClaudeConfig};
use engram_core::SystemClock;
use engram_daemon::config::Config;
use engram_daemon::lifecycle::{startup, LifecycleError, StartupResult};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Handle info flags before any config/lock acquisition
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(first) = args.first() {
        match first.as_str() {
            "--version" | "-V" => {
                println!("engramd {}", env!("CARGO_PKG_VERSION"));
                return std::process::ExitCode::SUCCESS;
            }
            "--help" | "-h" | "help" => {
                print_help();
                return std::process::ExitCode::SUCCESS;
            }
            _ => {}
        }
    }

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Usage: engramd --session-id=<id> [--key=value ...]");
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.state_dir) {
        eprintln!("error: cannot create state directory: {e}");
        return std::process::ExitCode::FAILURE;
    }

    // Rotate the log if it has grown too large, then mark this startup
    rotate_log_if_needed(&config.log_path());
    if let Err(e) = write_startup_marker(&config) {
        eprintln!("error: cannot write log file: {e}");
        return std::process::ExitCode::FAILURE;
    }

    let log_guard = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: logging setup failed: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(session_id = %config.session_id, "starting engramd");

    let adapter = ClaudeAgentAdapter::new(ClaudeConfig {
        cwd: config.cwd.clone(),
        mcp_server: config.mcp_server.clone(),
        python_path: config.python_path.clone(),
        call_timeout: config.agent_timeout,
        ..ClaudeConfig::default()
    });

    let StartupResult {
        supervisor,
        listener,
        shutdown,
        gateway,
    } = match startup(config.clone(), adapter, SystemClock).await {
        Ok(result) => result,
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start daemon: {}", e);
            // Best-effort crash record for external tooling
            if let Ok(gateway) = engram_storage::Gateway::open(
                config.session_id.clone(),
                &config.wal_path(),
                &config.snapshot_path(),
                SystemClock,
            ) {
                let _ = gateway.mark_crashed(&e.to_string());
            }
            drop(log_guard);
            return std::process::ExitCode::FAILURE;
        }
    };

    tokio::spawn(listener.run());
    spawn_signal_watcher(shutdown);

    info!(socket = %config.socket_path().display(), "daemon ready");

    // Signal ready for the launching hook
    println!("READY");

    // The supervisor runs on its own task so a panic there is caught here
    // and recorded as a crash instead of silently unwinding.
    let outcome = tokio::spawn(supervisor.run()).await;
    match outcome {
        Ok(Ok(())) => std::process::ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!("fatal daemon error: {}", e);
            let _ = gateway.mark_crashed(&e.to_string());
            std::process::ExitCode::FAILURE
        }
        Err(join_err) => {
            error!("supervisor panicked: {}", join_err);
            let _ = gateway.mark_crashed(&format!("panic: {join_err}"));
            std::process::ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("engramd {}", env!("CARGO_PKG_VERSION"));
    println!("Cognitive memory sidecar daemon for an interactive assistant session.");
    println!();
    println!("USAGE:");
    println!("    engramd --session-id=<id> [OPTIONS]");
    println!();
    println!("OPTIONS (all --key=value):");
    println!("    --session-id=<id>         Session to serve (required)");
    println!("    --cwd=<path>              Working directory for the agent runtime");
    println!("    --retriever=on|off        Prompt enrichment role (default on)");
    println!("    --learner=on|off          Knowledge extraction role (default on)");
    println!("    --compactor=on|off        Transcript compaction role (default on)");
    println!("    --mcp-server=<path>       Knowledge-tool MCP server");
    println!("    --python-path=<path>      Interpreter for the MCP server");
    println!("    --transcript-path=<path>  Session transcript for the compactor");
    println!("    --project-slug=<tag>      Tag stored with session-state rows");
    println!("    --last-compact-size=<n>   Initial compaction token cursor");
    println!();
    println!("    -h, --help       Print help information");
    println!("    -V, --version    Print version information");
}

/// Forward SIGTERM/SIGINT into the shared shutdown signal.
fn spawn_signal_watcher(shutdown: std::sync::Arc<tokio::sync::Notify>) {
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("signal handler setup failed: {}", e);
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!("signal handler setup failed: {}", e);
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
        shutdown.notify_one();
    });
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (engramd.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `engramd.log` -> `engramd.log.1` -> `.2` -> `.3`, deleting the
/// oldest. Best-effort: rotation failures are silently ignored so the
/// daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to the log before anything else. The hook
/// that launches the daemon uses this to find where the current attempt
/// begins. Full format: "--- engramd: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- engramd: starting (pid: ";

fn write_startup_marker(config: &Config) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())?;
    writeln!(
        file,
        "{}{}) ---\n",
        STARTUP_MARKER_PREFIX,
        std::process::id()
    )?;
    Ok(())
}

/// Write a startup error synchronously so it is visible even if the
/// process exits before the async appender flushes.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = config.log_path();
    let dir = log_path
        .parent()
        .ok_or_else(|| std::io::Error::other("log path has no parent directory"))?;
    let file_name = log_path
        .file_name()
        .ok_or_else(|| std::io::Error::other("log path has no file name"))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
