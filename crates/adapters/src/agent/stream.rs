// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-result extraction from the agent's stream-json output.
//!
//! The runtime emits one JSON record per line: a `system` init record,
//! interleaved `assistant`/`user` progress records, and exactly one terminal
//! `result` record carrying the reply text, the cost, and the session id.
//! Everything except the result is tolerated and skipped.

use super::AgentError;

/// Extracted fields of the terminal `result` record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StreamResult {
    pub is_error: bool,
    pub text: String,
    pub cost_usd: f64,
    pub session_id: Option<String>,
}

/// Extract a string value from a JSON object by key.
fn get_str<'a>(obj: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(|v| v.as_str())
}

/// Scan stream-json output for the terminal result record.
///
/// Later result records win (there should be exactly one). Unparseable
/// lines are skipped: the stream may carry stray diagnostics.
pub(crate) fn extract_result(output: &str) -> Result<StreamResult, AgentError> {
    let mut result = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let json: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if get_str(&json, "type") != Some("result") {
            continue;
        }

        let is_error = json
            .get("is_error")
            .and_then(|v| v.as_bool())
            .unwrap_or_else(|| {
                get_str(&json, "subtype").map(|s| s != "success").unwrap_or(false)
            });
        let text = get_str(&json, "result")
            .or_else(|| get_str(&json, "error"))
            .unwrap_or("")
            .to_string();
        let cost_usd = json
            .get("total_cost_usd")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let session_id = get_str(&json, "session_id").map(String::from);

        result = Some(StreamResult {
            is_error,
            text,
            cost_usd,
            session_id,
        });
    }

    result.ok_or(AgentError::MissingResult)
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
