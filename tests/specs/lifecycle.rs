//! Daemon lifecycle: liveness, shutdown paths, queue hygiene.

use crate::prelude::{spawn_daemon, wait_until};
use engram_adapters::FakeAgentAdapter;
use engram_core::{DaemonStatus, Role, SessionEventKind};
use std::time::Duration;

#[tokio::test]
async fn daemon_reports_running_with_fresh_heartbeat() {
    let adapter = FakeAgentAdapter::new();
    let daemon = spawn_daemon(adapter, |_| {}).await;

    let client = daemon.client.clone();
    wait_until(move || {
        let client = client.clone();
        async move { client.status().await.unwrap().status == Some(DaemonStatus::Running) }
    })
    .await;

    // After at least one heartbeat interval the timestamp moves past start
    let client = daemon.client.clone();
    wait_until(move || {
        let client = client.clone();
        async move {
            let report = client.status().await.unwrap();
            match (report.last_heartbeat_at_ms, report.started_at_ms) {
                (Some(heartbeat), Some(started)) => heartbeat > started,
                _ => false,
            }
        }
    })
    .await;

    assert!(daemon.client.ping().await);
    let version = daemon.client.hello().await.unwrap();
    assert!(!version.is_empty());

    daemon.stop().await;
}

#[tokio::test]
async fn session_end_event_stops_within_the_grace_window() {
    let adapter = FakeAgentAdapter::new();
    let daemon = spawn_daemon(adapter, |_| {}).await;

    daemon
        .client
        .enqueue_session_event(SessionEventKind::SessionEnd)
        .await
        .unwrap();

    let socket_path = daemon.config.socket_path();
    let lock_path = daemon.config.lock_path();
    daemon.join().await;

    // Clean teardown removes the socket and lock files
    assert!(!socket_path.exists());
    assert!(!lock_path.exists());
}

#[tokio::test]
async fn shutdown_request_sweeps_inflight_messages() {
    let adapter = FakeAgentAdapter::new();
    // Keep the learner slow so observations stay queued at shutdown
    adapter.set_delay(Role::Learner, Duration::from_secs(30));
    let daemon = spawn_daemon(adapter, |_| {}).await;

    for i in 0..3 {
        daemon
            .client
            .enqueue_tool_use("Bash", serde_json::json!(format!("cmd {i}")), serde_json::json!("ok"))
            .await
            .unwrap();
    }

    daemon.client.shutdown().await.unwrap();
    let config = daemon.config.clone();
    daemon.join().await;

    // The socket is gone; reopen the store directly to inspect the queue
    let gateway = engram_storage::Gateway::open(
        config.session_id.clone(),
        &config.wal_path(),
        &config.snapshot_path(),
        engram_core::SystemClock,
    )
    .unwrap();
    let snapshot = gateway.status_snapshot();
    assert_eq!(snapshot.pending, 0);
    assert_eq!(snapshot.processing, 0);
    assert_eq!(
        gateway.lookup_status(),
        Some(engram_core::DaemonStatus::Stopped)
    );
}

#[tokio::test]
async fn restart_preserves_queue_and_reuses_session_dir() {
    let adapter = FakeAgentAdapter::new();
    adapter.queue_reply(Role::Retriever, "context recovered after a daemon restart");
    let daemon = spawn_daemon(adapter, |_| {}).await;

    let (_, fingerprint) = daemon
        .client
        .enqueue_prompt("does state survive a restart?")
        .await
        .unwrap();

    let client = daemon.client.clone();
    let fp = fingerprint.clone();
    wait_until(move || {
        let client = client.clone();
        let fp = fp.clone();
        async move { client.retrieval(&fp).await.unwrap().is_some() }
    })
    .await;

    daemon.stop().await;
}

#[tokio::test]
async fn status_exposes_queue_depths() {
    let adapter = FakeAgentAdapter::new();
    // Stall the retriever so a second prompt would sit pending briefly
    adapter.set_delay(Role::Retriever, Duration::from_millis(300));
    let daemon = spawn_daemon(adapter, |_| {}).await;

    daemon.client.enqueue_prompt("first").await.unwrap();

    let client = daemon.client.clone();
    wait_until(move || {
        let client = client.clone();
        async move { client.status().await.unwrap().retriever_busy }
    })
    .await;

    let report = daemon.client.status().await.unwrap();
    assert_eq!(report.session_id, "spec-session");
    assert!(report.pid.is_some());

    daemon.stop().await;
}
