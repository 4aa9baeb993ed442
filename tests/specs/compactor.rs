//! Transcript compaction into versioned session-state documents.

use crate::prelude::{spawn_daemon, wait_until};
use engram_adapters::FakeAgentAdapter;
use engram_core::{Role, SessionEventKind};
use std::io::Write as _;
use std::path::Path;

fn write_large_transcript(path: &Path, target_bytes: usize) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(
        file,
        r#"{{"type":"user","message":{{"content":"please configure X for production"}}}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":"configured X and verified the service starts"}}]}}}}"#
    )
    .unwrap();
    let noise = r#"{"type":"progress","data":"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"}"#;
    let mut written = 0;
    while written < target_bytes {
        writeln!(file, "{noise}").unwrap();
        written += noise.len() + 1;
    }
}

#[tokio::test]
async fn threshold_crossing_writes_version_one_and_tail() {
    let adapter = FakeAgentAdapter::new();
    adapter.queue_reply(
        Role::Compactor,
        "# Session State\n\nGoal: configure X for production.\nCompleted: X configured, service verified.",
    );

    let daemon = spawn_daemon(adapter, |config| {
        let transcript = config.state_dir.join("transcript.jsonl");
        write_large_transcript(&transcript, 150_000);
        config.transcript_path = Some(transcript);
    })
    .await;

    let client = daemon.client.clone();
    wait_until(move || {
        let client = client.clone();
        async move { client.status().await.unwrap().session_state_version == Some(1) }
    })
    .await;

    // Tail snapshot exists on disk at the deterministic per-version path
    let tail_path = daemon.config.tail_path(1);
    assert!(tail_path.exists());
    let tail = std::fs::read_to_string(tail_path).unwrap();
    assert!(tail.contains("[USER]") || tail.contains("[CLAUDE]"));

    daemon.stop().await;
}

#[tokio::test]
async fn below_threshold_nothing_is_written_until_triggered() {
    let adapter = FakeAgentAdapter::new();
    adapter.queue_reply(
        Role::Compactor,
        "# Session State\n\nGoal: a short exchange, compacted on explicit request.",
    );

    let daemon = spawn_daemon(adapter, |config| {
        let transcript = config.state_dir.join("transcript.jsonl");
        write_large_transcript(&transcript, 1_000);
        config.transcript_path = Some(transcript);
    })
    .await;

    // Several compactor ticks pass without a row
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert_eq!(
        daemon.client.status().await.unwrap().session_state_version,
        None
    );

    daemon
        .client
        .enqueue_session_event(SessionEventKind::CompactorTrigger)
        .await
        .unwrap();

    let client = daemon.client.clone();
    wait_until(move || {
        let client = client.clone();
        async move { client.status().await.unwrap().session_state_version == Some(1) }
    })
    .await;

    daemon.stop().await;
}

#[tokio::test]
async fn short_agent_reply_is_not_persisted() {
    let adapter = FakeAgentAdapter::new();
    adapter.queue_reply(Role::Compactor, "ok");

    let daemon = spawn_daemon(adapter, |config| {
        let transcript = config.state_dir.join("transcript.jsonl");
        write_large_transcript(&transcript, 150_000);
        config.transcript_path = Some(transcript);
    })
    .await;

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(
        daemon.client.status().await.unwrap().session_state_version,
        None
    );

    daemon.stop().await;
}

#[tokio::test]
async fn missing_transcript_leaves_compactor_idle() {
    let adapter = FakeAgentAdapter::new();
    let daemon = spawn_daemon(adapter.clone(), |config| {
        config.transcript_path = Some(config.state_dir.join("never-created.jsonl"));
    })
    .await;

    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert_eq!(
        daemon.client.status().await.unwrap().session_state_version,
        None
    );
    assert_eq!(adapter.resume_count(Role::Compactor), 0);

    daemon.stop().await;
}
