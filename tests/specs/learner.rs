//! Knowledge extraction from tool observations.

use crate::prelude::{spawn_daemon, wait_until};
use engram_adapters::{AgentCall, FakeAgentAdapter};
use engram_core::Role;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn observation_reaches_the_learner_agent_once() {
    let adapter = FakeAgentAdapter::new();
    adapter.queue_reply(Role::Learner, "Saved error solution: spring-boot 3.2.1 fix");
    let daemon = spawn_daemon(adapter.clone(), |_| {}).await;

    daemon
        .client
        .enqueue_tool_use(
            "Bash",
            json!("mvn compile"),
            json!("BUILD FAILURE: could not resolve spring-boot-starter 3.2.0. Fixed by upgrading to 3.2.1"),
        )
        .await
        .unwrap();

    let client = daemon.client.clone();
    wait_until(move || {
        let client = client.clone();
        async move {
            let report = client.status().await.unwrap();
            report.pending == 0 && report.processing == 0
        }
    })
    .await;

    assert_eq!(adapter.resume_count(Role::Learner), 1);
    let message = adapter.resume_messages(Role::Learner).remove(0);
    assert!(message.contains("Tool: Bash"));
    assert!(message.contains("BUILD FAILURE"));

    daemon.stop().await;
}

#[tokio::test]
async fn busy_learner_defers_but_loses_nothing() {
    let adapter = FakeAgentAdapter::new();
    adapter.set_delay(Role::Learner, Duration::from_millis(120));
    let daemon = spawn_daemon(adapter.clone(), |_| {}).await;

    for i in 0..4 {
        daemon
            .client
            .enqueue_tool_use("Bash", json!(format!("cmd {i}")), json!("ok"))
            .await
            .unwrap();
    }

    let client = daemon.client.clone();
    wait_until(move || {
        let client = client.clone();
        async move {
            let report = client.status().await.unwrap();
            report.pending == 0 && report.processing == 0
        }
    })
    .await;

    // Every observation was processed exactly once despite the busy slot
    assert_eq!(adapter.resume_count(Role::Learner), 4);

    daemon.stop().await;
}

#[tokio::test]
async fn learner_error_never_touches_the_retrieval_queue() {
    let adapter = FakeAgentAdapter::new();
    adapter.queue_transport_error(Role::Learner, "agent connection lost");
    let daemon = spawn_daemon(adapter.clone(), |_| {}).await;

    daemon
        .client
        .enqueue_tool_use("Bash", json!("ls"), json!("ok"))
        .await
        .unwrap();

    let client = daemon.client.clone();
    wait_until(move || {
        let client = client.clone();
        async move {
            let report = client.status().await.unwrap();
            report.pending == 0 && report.processing == 0
        }
    })
    .await;

    let report = daemon.client.status().await.unwrap();
    assert_eq!(report.retrieval_rows, 0);

    daemon.stop().await;
}

#[tokio::test]
async fn learner_session_receives_its_system_prompt() {
    let adapter = FakeAgentAdapter::new();
    let daemon = spawn_daemon(adapter.clone(), |_| {}).await;

    let init_prompts: Vec<String> = adapter
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            AgentCall::Init {
                role: Role::Learner,
                system_prompt,
            } => Some(system_prompt),
            _ => None,
        })
        .collect();
    assert_eq!(init_prompts.len(), 1);
    assert!(init_prompts[0].contains("memory learner"));

    daemon.stop().await;
}
