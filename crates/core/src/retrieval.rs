// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retrieval queue rows: the retriever's reply to one prompt.

use crate::id::SessionId;
use serde::{Deserialize, Serialize};

/// Rows expire this long after creation; consumers treat expired rows as
/// absent.
pub const RETRIEVAL_TTL_MS: u64 = 60_000;

/// Relevance written when context text is present.
pub const RELEVANCE_HIT: f64 = 0.8;

/// Relevance written for a "none" result. The score is a boolean in float
/// form until a real scoring scheme exists.
pub const RELEVANCE_NONE: f64 = 0.0;

/// Classification of a retrieval reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextType {
    #[serde(rename = "memory-results")]
    MemoryResults,
    #[serde(rename = "none")]
    None,
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextType::MemoryResults => write!(f, "memory-results"),
            ContextType::None => write!(f, "none"),
        }
    }
}

/// The retriever's reply to one prompt message.
///
/// Exactly one row is written per prompt the retriever accepts, including a
/// "none" row on fast exit or when the retriever was mid-flight, so the
/// waiting hook never hangs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub session_id: SessionId,
    pub prompt_fingerprint: String,
    pub context_type: ContextType,
    pub context: Option<String>,
    pub relevance_score: f64,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl RetrievalResult {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

#[cfg(test)]
#[path = "retrieval_tests.rs"]
mod tests;
