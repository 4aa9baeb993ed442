// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fingerprint_is_stable_and_short() {
    let a = prompt_fingerprint("How do I configure X?");
    let b = prompt_fingerprint("How do I configure X?");
    assert_eq!(a, b);
    assert_eq!(a.len(), 12);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn fingerprint_differs_per_prompt() {
    assert_ne!(prompt_fingerprint("alpha"), prompt_fingerprint("beta"));
}

#[tokio::test]
async fn connect_failure_surfaces_as_protocol_error() {
    let client = Client::new("/nonexistent/engramd.sock");
    assert!(!client.ping().await);

    let err = client.status().await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(ProtocolError::Io(_))));
}
