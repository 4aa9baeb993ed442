// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use engram_core::{ContextType, DaemonStatus, FakeClock, MessageKind, SessionId};
use serde_json::json;

fn test_ctx(dir: &tempfile::TempDir) -> ListenCtx<FakeClock> {
    let gateway = Gateway::open(
        SessionId::new("s1"),
        &dir.path().join("wal").join("events.wal"),
        &dir.path().join("snapshot.zst"),
        FakeClock::new(1_000),
    )
    .unwrap();
    ListenCtx {
        gateway,
        busy: BusyFlags::default(),
        shutdown: Arc::new(Notify::new()),
    }
}

#[test]
fn ping_pongs() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);
    assert_eq!(handle_request(Request::Ping, &ctx), Response::Pong);
}

#[test]
fn hello_reports_protocol_version() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);
    let response = handle_request(
        Request::Hello {
            version: "9.9.9".to_string(),
        },
        &ctx,
    );
    assert_eq!(
        response,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[test]
fn enqueue_appends_pending_message() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);

    let response = handle_request(
        Request::Enqueue {
            kind: MessageKind::PromptContext,
            payload: json!({"prompt": "p", "promptFingerprint": "f"}),
        },
        &ctx,
    );
    assert_eq!(response, Response::Enqueued { id: 1 });
    assert_eq!(ctx.gateway.status_snapshot().pending, 1);
}

#[test]
fn enqueue_rejects_non_object_payload() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);

    let response = handle_request(
        Request::Enqueue {
            kind: MessageKind::ToolUse,
            payload: json!("just a string"),
        },
        &ctx,
    );
    assert!(matches!(response, Response::Error { .. }));
    assert_eq!(ctx.gateway.status_snapshot().pending, 0);
}

#[test]
fn retrieval_returns_row_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);

    let absent = handle_request(
        Request::Retrieval {
            fingerprint: "abc".to_string(),
        },
        &ctx,
    );
    assert_eq!(absent, Response::Retrieval { result: None });

    ctx.gateway
        .write_retrieval("abc", ContextType::MemoryResults, Some("ctx".to_string()))
        .unwrap();

    match handle_request(
        Request::Retrieval {
            fingerprint: "abc".to_string(),
        },
        &ctx,
    ) {
        Response::Retrieval { result: Some(row) } => {
            assert_eq!(row.context.as_deref(), Some("ctx"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn status_reflects_state_row_and_busy_flags() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);
    ctx.gateway.upsert_state_start(7, true, true, true).unwrap();
    ctx.busy
        .retriever
        .store(true, std::sync::atomic::Ordering::SeqCst);

    match handle_request(Request::Status, &ctx) {
        Response::Status { report } => {
            assert_eq!(report.session_id, "s1");
            assert_eq!(report.pid, Some(7));
            assert_eq!(report.status, Some(DaemonStatus::Starting));
            assert!(report.retriever_busy);
            assert!(!report.learner_busy);
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_marks_stopping_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(&dir);
    ctx.gateway.upsert_state_start(7, true, true, true).unwrap();

    let notified = ctx.shutdown.clone();
    let wait = tokio::spawn(async move { notified.notified().await });

    let response = handle_request(Request::Shutdown, &ctx);
    assert_eq!(response, Response::ShuttingDown);
    assert_eq!(ctx.gateway.lookup_status(), Some(DaemonStatus::Stopping));
    wait.await.unwrap();
}
