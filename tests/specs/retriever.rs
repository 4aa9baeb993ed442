//! Retrieval enrichment through the hook-facing socket.

use crate::prelude::{spawn_daemon, wait_until};
use engram_adapters::FakeAgentAdapter;
use engram_core::{ContextType, Role};
use std::time::Duration;

#[tokio::test]
async fn prompt_is_answered_with_memory_results() {
    let adapter = FakeAgentAdapter::new();
    adapter.queue_reply(Role::Retriever, "=== TEST CONTEXT ===\nrelevant thing\n");
    let daemon = spawn_daemon(adapter, |_| {}).await;

    let (_, fingerprint) = daemon
        .client
        .enqueue_prompt("How do I configure X?")
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

    let row = daemon.client.retrieval(&fingerprint).await.unwrap().unwrap();
    assert_eq!(row.context_type, ContextType::MemoryResults);
    assert!(row.context.unwrap().contains("=== TEST CONTEXT ==="));
    assert_eq!(row.relevance_score, 0.8);
    assert_eq!(row.prompt_fingerprint, fingerprint);

    daemon.stop().await;
}

#[tokio::test]
async fn skip_reply_yields_a_none_row() {
    let adapter = FakeAgentAdapter::new();
    adapter.queue_reply(Role::Retriever, "SKIP");
    let daemon = spawn_daemon(adapter, |_| {}).await;

    let (_, fingerprint) = daemon.client.enqueue_prompt("anything?").await.unwrap();

    let client = daemon.client.clone();
    let fp = fingerprint.clone();
    wait_until(move || {
        let client = client.clone();
        let fp = fp.clone();
        async move { client.retrieval(&fp).await.unwrap().is_some() }
    })
    .await;

    let row = daemon.client.retrieval(&fingerprint).await.unwrap().unwrap();
    assert_eq!(row.context_type, ContextType::None);
    assert!(row.context.is_none());
    assert_eq!(row.relevance_score, 0.0);

    daemon.stop().await;
}

#[tokio::test]
async fn concurrent_prompts_busy_skip_the_second() {
    let adapter = FakeAgentAdapter::new();
    adapter.set_delay(Role::Retriever, Duration::from_millis(400));
    adapter.queue_reply(Role::Retriever, "stored context about the deploy pipeline");
    let daemon = spawn_daemon(adapter, |_| {}).await;

    let (_, fp_first) = daemon.client.enqueue_prompt("first question").await.unwrap();
    let (_, fp_second) = daemon
        .client
        .enqueue_prompt("second question")
        .await
        .unwrap();

    // The second prompt gets its none row well before the first finishes
    let client = daemon.client.clone();
    let fp = fp_second.clone();
    tokio::time::timeout(Duration::from_secs(1), async move {
        loop {
            if client.retrieval(&fp).await.unwrap().is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("busy-skip row not written within 1s");

    let skipped = daemon.client.retrieval(&fp_second).await.unwrap().unwrap();
    assert_eq!(skipped.context_type, ContextType::None);
    assert_eq!(skipped.relevance_score, 0.0);

    // The first prompt is processed normally
    let client = daemon.client.clone();
    let fp = fp_first.clone();
    wait_until(move || {
        let client = client.clone();
        let fp = fp.clone();
        async move { client.retrieval(&fp).await.unwrap().is_some() }
    })
    .await;
    let first = daemon.client.retrieval(&fp_first).await.unwrap().unwrap();
    assert_eq!(first.context_type, ContextType::MemoryResults);

    daemon.stop().await;
}

#[tokio::test]
async fn disabled_retriever_still_answers_none() {
    let adapter = FakeAgentAdapter::new();
    let daemon = spawn_daemon(adapter.clone(), |config| config.retriever_on = false).await;

    let (_, fingerprint) = daemon.client.enqueue_prompt("hello?").await.unwrap();

    let client = daemon.client.clone();
    let fp = fingerprint.clone();
    wait_until(move || {
        let client = client.clone();
        let fp = fp.clone();
        async move { client.retrieval(&fp).await.unwrap().is_some() }
    })
    .await;

    assert_eq!(
        daemon
            .client
            .retrieval(&fingerprint)
            .await
            .unwrap()
            .unwrap()
            .context_type,
        ContextType::None
    );
    assert_eq!(adapter.resume_count(Role::Retriever), 0);

    daemon.stop().await;
}
