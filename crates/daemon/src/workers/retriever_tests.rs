// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    empty = { "", ReplyClass::Skip },
    whitespace = { "   \n", ReplyClass::Skip },
    literal_skip = { "SKIP", ReplyClass::Skip },
    lowercase_skip = { "skip", ReplyClass::Skip },
    padded_skip = { "  SKIP\n", ReplyClass::Skip },
    too_short = { "nothing here", ReplyClass::Skip },
    real_context = { "Previously solved: upgrade spring-boot to 3.2.1", ReplyClass::Context },
)]
fn classifies_replies(text: &str, expected: ReplyClass) {
    assert_eq!(classify(text), expected);
}

#[test]
fn twenty_chars_is_the_context_floor() {
    assert_eq!(classify(&"x".repeat(19)), ReplyClass::Skip);
    assert_eq!(classify(&"x".repeat(20)), ReplyClass::Context);
}

#[test]
fn message_carries_prompt_window_and_directive() {
    let message = compose_message("How do I deploy?", "[user] earlier question");
    assert!(message.contains("How do I deploy?"));
    assert!(message.contains("[user] earlier question"));
    assert!(message.contains("Reply SKIP"));
}

#[test]
fn summary_is_capped_at_100_chars() {
    let long = "y".repeat(300);
    assert_eq!(summary(&long).chars().count(), 100);
    assert_eq!(summary("  short  "), "short");
}

#[test]
fn limits_are_tight() {
    let limits = limits();
    assert_eq!(limits.max_turns, 5);
    assert!(!limits.tool_allowlist.is_empty());
}
