// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sliding window of recent user turns and role summaries.
//!
//! The window enriches retriever prompts with a compact trace of recent
//! session activity. It is single-writer: only the supervisor dispatch path
//! touches it, so no locking is required.

use std::collections::VecDeque;

/// Default retained history: last 5 user/assistant pairs.
pub const DEFAULT_MAX_PAIRS: usize = 5;

const EMPTY_PLACEHOLDER: &str = "(no recent session activity)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRole {
    User,
    AssistantSummary,
}

/// One retained window entry. Entries are never mutated; the oldest are
/// dropped on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEntry {
    pub role: WindowRole,
    pub text: String,
}

/// Bounded ordered log of recent turns, trimmed on insert.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    entries: VecDeque<WindowEntry>,
    max_entries: usize,
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::with_max_pairs(DEFAULT_MAX_PAIRS)
    }

    pub fn with_max_pairs(pairs: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: pairs * 2,
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(WindowRole::User, text.into());
    }

    pub fn push_summary(&mut self, text: impl Into<String>) {
        self.push(WindowRole::AssistantSummary, text.into());
    }

    fn push(&mut self, role: WindowRole, text: String) {
        self.entries.push_back(WindowEntry { role, text });
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Multi-line transcript of the retained entries with role prefixes.
    pub fn format(&self) -> String {
        if self.entries.is_empty() {
            return EMPTY_PLACEHOLDER.to_string();
        }
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| match e.role {
                WindowRole::User => format!("[user] {}", e.text),
                WindowRole::AssistantSummary => format!("[assistant] {}", e.text),
            })
            .collect();
        lines.join("\n")
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
