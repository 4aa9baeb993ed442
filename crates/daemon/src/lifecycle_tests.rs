// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use engram_adapters::FakeAgentAdapter;
use engram_core::SystemClock;

fn test_config(dir: &tempfile::TempDir) -> Config {
    Config::from_args(["--session-id=s1".to_string()])
        .unwrap()
        .with_state_dir(dir.path())
}

#[tokio::test]
async fn startup_binds_socket_and_writes_pid() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let result = startup(config.clone(), FakeAgentAdapter::new(), SystemClock)
        .await
        .unwrap();

    assert!(config.socket_path().exists());
    let pid: u32 = std::fs::read_to_string(config.lock_path())
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(pid, std::process::id());
    drop(result);
}

#[tokio::test]
async fn second_instance_fails_to_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let _first = startup(config.clone(), FakeAgentAdapter::new(), SystemClock)
        .await
        .unwrap();

    let err = startup(config, FakeAgentAdapter::new(), SystemClock)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::LockFailed(_)));
}

#[tokio::test]
async fn stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(config.socket_path(), b"").unwrap();

    let result = startup(config.clone(), FakeAgentAdapter::new(), SystemClock).await;
    assert!(result.is_ok());
    assert!(config.socket_path().exists());
}
