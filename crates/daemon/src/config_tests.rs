// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn args(list: &[&str]) -> impl IntoIterator<Item = String> {
    list.iter().map(|s| s.to_string()).collect::<Vec<_>>()
}

#[test]
fn minimal_invocation_defaults_roles_on() {
    let config = Config::from_args(args(&["--session-id=s1"])).unwrap();
    assert_eq!(config.session_id, "s1");
    assert!(config.retriever_on);
    assert!(config.learner_on);
    assert!(config.compactor_on);
    assert_eq!(config.project_slug, "default");
    assert_eq!(config.last_compact_tokens, 0);
    assert!(config.transcript_path.is_none());
}

#[test]
fn full_invocation_parses_every_flag() {
    let config = Config::from_args(args(&[
        "--session-id=s1",
        "--cwd=/work/project",
        "--retriever=on",
        "--learner=off",
        "--compactor=on",
        "--mcp-server=/opt/memory/server.py",
        "--python-path=/usr/bin/python3",
        "--transcript-path=/tmp/transcript.jsonl",
        "--project-slug=myproj",
        "--last-compact-size=25000",
    ]))
    .unwrap();

    assert_eq!(config.cwd.as_deref(), Some(std::path::Path::new("/work/project")));
    assert!(!config.learner_on);
    assert_eq!(config.mcp_server.as_deref(), Some("/opt/memory/server.py"));
    assert_eq!(config.project_slug, "myproj");
    assert_eq!(config.last_compact_tokens, 25_000);
}

#[test]
fn missing_session_id_is_rejected() {
    assert!(matches!(
        Config::from_args(args(&["--retriever=on"])),
        Err(ConfigError::MissingSessionId)
    ));
}

#[parameterized(
    bare_flag = { "--retriever" },
    no_dashes = { "session-id=s1" },
    unknown_key = { "--frobnicate=yes" },
)]
fn malformed_arguments_are_rejected(arg: &str) {
    assert!(matches!(
        Config::from_args(args(&["--session-id=s1", arg])),
        Err(ConfigError::UnknownArgument(_))
    ));
}

#[parameterized(
    role_value = { "--learner=maybe" },
    size_value = { "--last-compact-size=many" },
)]
fn invalid_values_are_rejected(arg: &str) {
    assert!(matches!(
        Config::from_args(args(&["--session-id=s1", arg])),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn state_paths_derive_from_state_dir() {
    let config = Config::from_args(args(&["--session-id=s1"]))
        .unwrap()
        .with_state_dir("/tmp/engram-test");

    assert_eq!(
        config.socket_path(),
        PathBuf::from("/tmp/engram-test/engramd.sock")
    );
    assert_eq!(
        config.wal_path(),
        PathBuf::from("/tmp/engram-test/wal/events.wal")
    );
    assert_eq!(
        config.tail_path(3),
        PathBuf::from("/tmp/engram-test/tails/s1-v3.txt")
    );
}
