// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box specs for the engramd binary: flags and exit codes.
//!
//! These never start a real daemon; they only exercise argument handling,
//! which exits before any lock or socket is touched.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use assert_cmd::Command;

fn engramd() -> Command {
    Command::cargo_bin("engramd").unwrap()
}

#[test]
fn help_prints_usage_and_exits_zero() {
    engramd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("USAGE:"))
        .stdout(predicates::str::contains("--session-id"));
}

#[test]
fn version_prints_name_and_version() {
    engramd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("engramd"));
}

#[test]
fn missing_session_id_exits_one() {
    engramd()
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("--session-id"));
}

#[test]
fn unknown_argument_exits_one() {
    engramd()
        .arg("--session-id=s1")
        .arg("--bogus=1")
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("bogus"));
}

#[test]
fn malformed_flag_exits_one() {
    engramd()
        .arg("--session-id")
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("--key=value"));
}
