// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage
//!
//! One JSON object per line, each synced before the append returns. A crash
//! mid-append can leave a torn final line; it is discarded on open and
//! skipped on replay. Corruption anywhere else is an error.

use bb_core::Operation;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL entry at {path}:{line}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    file: File,
    sequence: u64,
}

impl Wal {
    /// Open or create a WAL at the given path
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        drop_torn_tail(path)?;

        let reader = BufReader::new(File::open(path)?);
        let mut sequence = 0;
        for line in reader.lines() {
            if !line?.trim().is_empty() {
                sequence += 1;
            }
        }

        Ok(Self { file, sequence })
    }

    /// Append an operation to the log
    pub fn append(&mut self, op: &Operation) -> Result<u64, WalError> {
        self.append_with(op, |file, line| {
            file.write_all(line)?;
            file.sync_all()
        })
    }

    /// Append through `write`. A failed write is cut back to the previous
    /// end of the log so the next append starts on a line boundary.
    fn append_with(
        &mut self,
        op: &Operation,
        write: impl FnOnce(&mut File, &[u8]) -> io::Result<()>,
    ) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let end = self.file.metadata()?.len();
        if let Err(e) = write(&mut self.file, &line) {
            self.file.set_len(end)?;
            self.file.sync_all()?;
            return Err(e.into());
        }
        self.sequence += 1;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay all operations from the log
    pub fn replay(path: &Path) -> Result<Vec<Operation>, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
        let last = lines.len();
        let mut ops = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(line) {
                Ok(entry) => ops.push(entry.op),
                // Torn final write
                Err(_) if index + 1 == last => break,
                Err(source) => {
                    return Err(WalError::Corrupt {
                        path: path.to_path_buf(),
                        line: index + 1,
                        source,
                    })
                }
            }
        }

        Ok(ops)
    }
}

/// Truncate a final line that lacks its newline
fn drop_torn_tail(path: &Path) -> Result<(), WalError> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    if bytes.is_empty() || bytes.ends_with(b"\n") {
        return Ok(());
    }
    let keep = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |pos| pos + 1);
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(keep as u64)?;
    file.sync_all()?;
    Ok(())
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WalEntry {
    seq: u64,
    op: Operation,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
