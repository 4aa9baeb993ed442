// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: CLI arguments and the per-session state directory.

use engram_core::SessionId;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required argument --session-id")]
    MissingSessionId,
    #[error("unexpected argument '{0}' (expected --key=value)")]
    UnknownArgument(String),
    #[error("invalid value for --{key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("could not determine state directory")]
    NoStateDir,
}

/// Daemon configuration, one instance per user session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Opaque id of the user session this daemon serves.
    pub session_id: SessionId,
    /// Working directory passed to the agent runtime.
    pub cwd: Option<PathBuf>,
    pub retriever_on: bool,
    pub learner_on: bool,
    pub compactor_on: bool,
    /// Knowledge-tool endpoint, passed opaquely to the agent adapter.
    pub mcp_server: Option<String>,
    pub python_path: Option<String>,
    /// Transcript file read by the compactor; absent means the compactor
    /// idles.
    pub transcript_path: Option<PathBuf>,
    /// Tag stored with session-state rows.
    pub project_slug: String,
    /// Initial value of the compactor's token cursor (resuming after a
    /// context-reset handoff).
    pub last_compact_tokens: u64,
    /// Per-session state directory (socket, lock, log, WAL, snapshot, tails).
    pub state_dir: PathBuf,

    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub compact_interval: Duration,
    pub shutdown_grace: Duration,
    pub agent_timeout: Duration,
}

impl Config {
    /// Parse `--key=value` arguments. Only `session-id` is required.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        let mut session_id = None;
        let mut cwd = None;
        let mut retriever_on = true;
        let mut learner_on = true;
        let mut compactor_on = true;
        let mut mcp_server = None;
        let mut python_path = None;
        let mut transcript_path = None;
        let mut project_slug = "default".to_string();
        let mut last_compact_tokens = 0;

        for arg in args {
            let Some(stripped) = arg.strip_prefix("--") else {
                return Err(ConfigError::UnknownArgument(arg));
            };
            let Some((key, value)) = stripped.split_once('=') else {
                return Err(ConfigError::UnknownArgument(arg));
            };

            match key {
                "session-id" => session_id = Some(SessionId::new(value)),
                "cwd" => cwd = Some(PathBuf::from(value)),
                "retriever" => retriever_on = parse_on_off(key, value)?,
                "learner" => learner_on = parse_on_off(key, value)?,
                "compactor" => compactor_on = parse_on_off(key, value)?,
                "mcp-server" => mcp_server = Some(value.to_string()),
                "python-path" => python_path = Some(value.to_string()),
                "transcript-path" => transcript_path = Some(PathBuf::from(value)),
                "project-slug" => project_slug = value.to_string(),
                "last-compact-size" => {
                    last_compact_tokens =
                        value.parse().map_err(|_| ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })?
                }
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        let session_id = session_id.ok_or(ConfigError::MissingSessionId)?;
        let state_dir = default_state_dir(&session_id)?;

        Ok(Self {
            session_id,
            cwd,
            retriever_on,
            learner_on,
            compactor_on,
            mcp_server,
            python_path,
            transcript_path,
            project_slug,
            last_compact_tokens,
            state_dir,
            poll_interval: crate::env::poll_interval(),
            heartbeat_interval: crate::env::heartbeat_interval(),
            compact_interval: crate::env::compact_interval(),
            shutdown_grace: crate::env::shutdown_grace(),
            agent_timeout: crate::env::agent_timeout(),
        })
    }

    /// Relocate all state under `dir` (tests use a temp directory).
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_dir.join("engramd.sock")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("engramd.pid")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("engramd.log")
    }

    pub fn wal_path(&self) -> PathBuf {
        self.state_dir.join("wal").join("events.wal")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.state_dir.join("snapshot.zst")
    }

    /// Directory for raw transcript tail files, one per compaction.
    pub fn tails_dir(&self) -> PathBuf {
        self.state_dir.join("tails")
    }

    /// Deterministic tail file path for a compaction version.
    pub fn tail_path(&self, version: u32) -> PathBuf {
        self.tails_dir()
            .join(format!("{}-v{}.txt", self.session_id, version))
    }
}

fn parse_on_off(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// `$XDG_STATE_HOME/engram/<session-id>/` (or the platform equivalent).
fn default_state_dir(session_id: &SessionId) -> Result<PathBuf, ConfigError> {
    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or(ConfigError::NoStateDir)?;
    Ok(base.join("engram").join(session_id.as_str()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
