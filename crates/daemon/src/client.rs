// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed socket client for the daemon.
//!
//! Used by the hook scripts (enqueue prompts and tool observations, poll
//! for retrieval rows, drive shutdown) and by the behavioral specs. One
//! connection per request, mirroring the listener's request/response shape.

use crate::protocol::{
    self, ProtocolError, Request, Response, StatusReport, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};
use engram_core::{MessageKind, RetrievalResult, SessionEventKind};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::UnixStream;

/// Length of a prompt fingerprint in hex characters.
const FINGERPRINT_CHARS: usize = 12;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("daemon rejected request: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Stable short hash correlating a retrieval row with the prompt that asked
/// for it.
pub fn prompt_fingerprint(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..FINGERPRINT_CHARS].to_string()
}

/// Socket client, one request per connection.
#[derive(Debug, Clone)]
pub struct Client {
    socket_path: PathBuf,
}

impl Client {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(ProtocolError::Io)?;
        let data = protocol::encode(request)?;
        protocol::write_message(&mut stream, &data).await?;
        let bytes = tokio::time::timeout(DEFAULT_TIMEOUT, protocol::read_message(&mut stream))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        let response: Response = protocol::decode(&bytes)?;
        match response {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Ok(other),
        }
    }

    pub async fn ping(&self) -> bool {
        matches!(self.request(&Request::Ping).await, Ok(Response::Pong))
    }

    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .request(&Request::Hello {
                version: PROTOCOL_VERSION.to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            other => Err(ClientError::Unexpected(format!("{other:?}"))),
        }
    }

    /// Enqueue a prompt for enrichment; returns (message id, fingerprint).
    pub async fn enqueue_prompt(&self, prompt: &str) -> Result<(u64, String), ClientError> {
        let fingerprint = prompt_fingerprint(prompt);
        let id = self
            .enqueue(
                MessageKind::PromptContext,
                serde_json::json!({
                    "prompt": prompt,
                    "promptFingerprint": fingerprint,
                }),
            )
            .await?;
        Ok((id, fingerprint))
    }

    /// Enqueue a tool observation for the learner.
    pub async fn enqueue_tool_use(
        &self,
        tool_name: &str,
        tool_input: serde_json::Value,
        tool_response: serde_json::Value,
    ) -> Result<u64, ClientError> {
        self.enqueue(
            MessageKind::ToolUse,
            serde_json::json!({
                "toolName": tool_name,
                "toolInput": tool_input,
                "toolResponse": tool_response,
            }),
        )
        .await
    }

    /// Enqueue a session lifecycle event.
    pub async fn enqueue_session_event(
        &self,
        event: SessionEventKind,
    ) -> Result<u64, ClientError> {
        self.enqueue(
            MessageKind::SessionEvent,
            serde_json::json!({ "event": event }),
        )
        .await
    }

    pub async fn enqueue(
        &self,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> Result<u64, ClientError> {
        match self.request(&Request::Enqueue { kind, payload }).await? {
            Response::Enqueued { id } => Ok(id),
            other => Err(ClientError::Unexpected(format!("{other:?}"))),
        }
    }

    /// The retrieval row for a fingerprint, absent when none exists yet or
    /// it has expired.
    pub async fn retrieval(
        &self,
        fingerprint: &str,
    ) -> Result<Option<RetrievalResult>, ClientError> {
        match self
            .request(&Request::Retrieval {
                fingerprint: fingerprint.to_string(),
            })
            .await?
        {
            Response::Retrieval { result } => Ok(result),
            other => Err(ClientError::Unexpected(format!("{other:?}"))),
        }
    }

    pub async fn status(&self) -> Result<StatusReport, ClientError> {
        match self.request(&Request::Status).await? {
            Response::Status { report } => Ok(report),
            other => Err(ClientError::Unexpected(format!("{other:?}"))),
        }
    }

    /// Ask the daemon to stop (external actor path).
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.request(&Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Err(ClientError::Unexpected(format!("{other:?}"))),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
