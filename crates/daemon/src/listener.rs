// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Runs in a spawned task, accepting hook connections and handling them
//! without blocking the supervisor loop. One request/response pair per
//! connection.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use engram_core::Clock;
use engram_storage::Gateway;
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::protocol::{
    self, Request, Response, StatusReport, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};
use crate::workers::BusyFlags;

/// Shared daemon context for all request handlers.
#[derive(Debug)]
pub(crate) struct ListenCtx<C: Clock> {
    pub gateway: Gateway<C>,
    pub busy: BusyFlags,
    pub shutdown: Arc<Notify>,
}

/// Listener task for accepting socket connections.
#[derive(Debug)]
pub struct Listener<C: Clock> {
    socket: UnixListener,
    ctx: Arc<ListenCtx<C>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<C: Clock> Listener<C> {
    pub(crate) fn new(socket: UnixListener, ctx: ListenCtx<C>) -> Self {
        Self {
            socket,
            ctx: Arc::new(ctx),
        }
    }

    /// Run the accept loop until the task is dropped at shutdown.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("connection timeout")
                                }
                                _ => error!("connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<C: Clock>(
    stream: UnixStream,
    ctx: &ListenCtx<C>,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    // Retrieval polls are frequent; keep them at debug
    if matches!(request, Request::Retrieval { .. } | Request::Ping) {
        debug!(request = ?request, "received request");
    } else {
        tracing::info!(request = ?request, "received request");
    }

    let response = handle_request(request, ctx);
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;

    Ok(())
}

/// Handle a single request and return a response.
pub(crate) fn handle_request<C: Clock>(request: Request, ctx: &ListenCtx<C>) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Enqueue { kind, payload } => {
            if !payload.is_object() {
                return Response::Error {
                    message: "payload must be a JSON object".to_string(),
                };
            }
            match ctx.gateway.enqueue(kind, payload) {
                Ok(id) => Response::Enqueued { id },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::Retrieval { fingerprint } => Response::Retrieval {
            result: ctx.gateway.latest_retrieval(&fingerprint),
        },

        Request::Status => {
            let snapshot = ctx.gateway.status_snapshot();
            Response::Status {
                report: StatusReport {
                    session_id: ctx.gateway.session_id().to_string(),
                    pid: snapshot.row.as_ref().map(|r| r.pid),
                    status: snapshot.row.as_ref().map(|r| r.status),
                    started_at_ms: snapshot.row.as_ref().map(|r| r.started_at_ms),
                    last_heartbeat_at_ms: snapshot.row.as_ref().map(|r| r.last_heartbeat_at_ms),
                    pending: snapshot.pending,
                    processing: snapshot.processing,
                    retrieval_rows: snapshot.retrieval_rows,
                    session_state_version: snapshot.session_state_version,
                    retriever_busy: ctx.busy.retriever.load(Ordering::SeqCst),
                    learner_busy: ctx.busy.learner.load(Ordering::SeqCst),
                    compactor_busy: ctx.busy.compactor.load(Ordering::SeqCst),
                },
            }
        }

        Request::Shutdown => {
            if let Err(e) = ctx.gateway.mark_stopping() {
                warn!(error = %e, "failed to mark state row stopping");
            }
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
