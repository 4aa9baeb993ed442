// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event builders for other crates' tests.
#![allow(clippy::unwrap_used)]

use crate::event::Event;
use crate::message::MessageKind;
use serde_json::json;

pub fn prompt_enqueued_event(id: u64, prompt: &str, fingerprint: &str) -> Event {
    Event::MessageEnqueued {
        id,
        kind: MessageKind::PromptContext,
        payload: json!({"prompt": prompt, "promptFingerprint": fingerprint}),
        created_at_ms: 1_000 + id,
    }
}

pub fn tool_use_enqueued_event(id: u64, tool_name: &str, input: &str, response: &str) -> Event {
    Event::MessageEnqueued {
        id,
        kind: MessageKind::ToolUse,
        payload: json!({"toolName": tool_name, "toolInput": input, "toolResponse": response}),
        created_at_ms: 1_000 + id,
    }
}

pub fn session_event_enqueued(id: u64, event: &str) -> Event {
    Event::MessageEnqueued {
        id,
        kind: MessageKind::SessionEvent,
        payload: json!({"event": event}),
        created_at_ms: 1_000 + id,
    }
}

pub fn daemon_starting_event(pid: u32) -> Event {
    Event::DaemonStarting {
        pid,
        retriever_on: true,
        learner_on: true,
        compactor_on: true,
        started_at_ms: 1_000,
    }
}
