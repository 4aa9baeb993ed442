// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversational chunk extraction from the session transcript.
//!
//! The transcript is a JSONL file dominated by tool progress noise. Only
//! `user` and `assistant` records with a text body become chunks; everything
//! else is skipped silently. Each chunk keeps its byte offset so a later
//! revision can tail incrementally instead of re-reading the file.

use super::truncate_chars;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Per-chunk body cap in characters.
pub(crate) const CHUNK_CHAR_LIMIT: usize = 3_000;

/// Total window budget in extracted conversational characters.
pub(crate) const WINDOW_CHAR_BUDGET: usize = 30_000;

/// Transcript bytes per estimated token.
pub(crate) const BYTES_PER_TOKEN: u64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkLabel {
    User,
    Claude,
}

impl ChunkLabel {
    fn tag(&self) -> &'static str {
        match self {
            ChunkLabel::User => "[USER]",
            ChunkLabel::Claude => "[CLAUDE]",
        }
    }
}

/// One labelled conversational chunk with its byte offset in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub offset: u64,
    pub label: ChunkLabel,
    pub text: String,
}

impl Chunk {
    pub fn render(&self) -> String {
        format!("{} {}", self.label.tag(), self.text)
    }
}

/// Estimate cumulative tokens from the transcript file size.
pub(crate) fn estimate_tokens(file_len: u64) -> u64 {
    file_len / BYTES_PER_TOKEN
}

/// Stream-parse the transcript into labelled chunks.
///
/// Extraction is deterministic: the same file yields the same chunk list
/// and offsets. Malformed or non-conversational lines are skipped.
pub(crate) fn extract_chunks(path: &Path) -> io::Result<Vec<Chunk>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut chunks = Vec::new();
    let mut offset = 0u64;
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
            Err(e) => return Err(e),
        };
        let line_offset = offset;
        offset += bytes_read as u64;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let json: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => continue,
        };

        let label = match json.get("type").and_then(|v| v.as_str()) {
            Some("user") => ChunkLabel::User,
            Some("assistant") => ChunkLabel::Claude,
            _ => continue,
        };
        let Some(body) = body_text(&json) else {
            continue;
        };
        if body.is_empty() {
            continue;
        }

        chunks.push(Chunk {
            offset: line_offset,
            label,
            text: truncate_chars(&body, CHUNK_CHAR_LIMIT).to_string(),
        });
    }

    Ok(chunks)
}

/// Extract the text body of a conversational record.
///
/// `message.content` is either a plain string or an array of content blocks
/// from which the text blocks are joined.
fn body_text(json: &serde_json::Value) -> Option<String> {
    let content = json.get("message")?.get("content")?;

    if let Some(text) = content.as_str() {
        return Some(text.trim().to_string());
    }

    let blocks = content.as_array()?;
    let parts: Vec<&str> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("\n").trim().to_string())
}

/// The contiguous suffix of chunks fitting the character budget.
///
/// Walks backwards from the end, collecting chunks until the budget would
/// be exceeded. The window is measured in extracted conversational
/// characters, not raw file bytes.
pub(crate) fn window_chunks(chunks: &[Chunk], budget: usize) -> &[Chunk] {
    let mut total = 0usize;
    let mut start = chunks.len();
    for (idx, chunk) in chunks.iter().enumerate().rev() {
        let len = chunk.text.chars().count();
        if total + len > budget {
            break;
        }
        total += len;
        start = idx;
    }
    &chunks[start..]
}

/// Render chunks as the agent-facing window text.
pub(crate) fn render_chunks(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(Chunk::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Raw tail snapshot: the second half of the collected chunks.
pub(crate) fn tail_snapshot(chunks: &[Chunk]) -> String {
    let start = chunks.len() / 2;
    render_chunks(&chunks[start..])
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
