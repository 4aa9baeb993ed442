// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL event write-ahead log.
//!
//! Events are durably appended before they are applied to state, enabling
//! crash recovery via snapshot + replay. The store's event rate is low
//! (hook pushes and worker completions), so entries are written eagerly and
//! fsynced per gateway operation rather than group-committed.
//!
//! Each entry is a single line of JSON: `{"seq":N,"event":{...}}\n`

use engram_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in Wal operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization helper for writing WAL entries without cloning the event.
#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

/// Deserialization helper for reading WAL entries.
#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    event: Event,
}

/// A single WAL entry with sequence number
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only JSONL WAL.
#[derive(Debug)]
pub struct Wal {
    file: File,
    path: PathBuf,
    /// Highest sequence number written so far
    write_seq: u64,
}

impl Wal {
    /// Open or create a WAL at the given path.
    ///
    /// Returns the WAL plus every entry with `seq > after_seq` for replay
    /// (`after_seq` comes from the snapshot, or 0 without one). A corrupt
    /// tail is rotated to a `.bak` file and the valid prefix preserved.
    pub fn open(path: &Path, after_seq: u64) -> Result<(Self, Vec<WalEntry>), WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (entries, corrupt) = Self::scan(&file)?;

        let file = if corrupt {
            drop(file);
            let bak_path = crate::snapshot::rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = entries.len(),
                "corrupt WAL detected, rotating to .bak and preserving valid entries",
            );
            std::fs::rename(path, &bak_path)?;

            let mut new_file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)?;
            for entry in &entries {
                let record = WalRecordRef {
                    seq: entry.seq,
                    event: &entry.event,
                };
                serde_json::to_writer(&mut new_file, &record)?;
                new_file.write_all(b"\n")?;
            }
            new_file.sync_all()?;
            new_file
        } else {
            file
        };

        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0);
        let replay: Vec<WalEntry> = entries.into_iter().filter(|e| e.seq > after_seq).collect();

        Ok((
            Self {
                file,
                path: path.to_owned(),
                write_seq,
            },
            replay,
        ))
    }

    /// Read all valid entries, stopping at the first corrupt line.
    ///
    /// Returns `(entries, corrupt)` where `corrupt` is true if a parse error
    /// was encountered before EOF.
    fn scan(file: &File) -> Result<(Vec<WalEntry>, bool), WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::new();
        let mut corrupt = false;
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    corrupt = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<WalRecord>(trimmed) {
                Ok(record) => entries.push(WalEntry {
                    seq: record.seq,
                    event: record.event,
                }),
                Err(_) => {
                    corrupt = true;
                    break;
                }
            }
        }

        Ok((entries, corrupt))
    }

    /// Append an event, assigning the next sequence number.
    ///
    /// The entry is written immediately; call `flush()` to fsync.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let record = WalRecordRef { seq, event };
        let mut json_bytes = serde_json::to_vec(&record)?;
        json_bytes.push(b'\n');
        self.file.write_all(&json_bytes)?;
        Ok(seq)
    }

    /// Fsync written entries. This is the durability point.
    pub fn flush(&mut self) -> Result<(), WalError> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Highest sequence number written so far.
    pub fn last_seq(&self) -> u64 {
        self.write_seq
    }

    /// Drop entries with `seq <= through`, keeping any later tail.
    ///
    /// Called only after a snapshot covering `through` is durable.
    pub fn truncate_through(&mut self, through: u64) -> Result<(), WalError> {
        if through >= self.write_seq {
            self.file.set_len(0)?;
            self.file.seek(SeekFrom::End(0))?;
            return Ok(());
        }

        // Partial truncation: rewrite the surviving tail atomically.
        let (entries, _) = Self::scan(&self.file)?;
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for entry in entries.iter().filter(|e| e.seq > through) {
                let record = WalRecordRef {
                    seq: entry.seq,
                    event: &entry.event,
                };
                serde_json::to_writer(&mut tmp, &record)?;
                tmp.write_all(b"\n")?;
            }
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;

        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
