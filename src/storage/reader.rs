//! Commit log reader with torn-tail and corruption detection
//!
//! - Every frame is checksum-verified
//! - An incomplete final frame is a torn write: reading stops before it and
//!   the caller decides whether to truncate
//! - An incomplete frame followed by a verifiable one is corruption
//! - A complete frame that fails verification is fatal corruption
//! - Sequences must be strictly increasing

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::batch::Batch;
use super::errors::{StorageError, StorageResult};
use super::frame;

/// Result of reading a whole log.
#[derive(Debug, Default)]
pub struct Replay {
    /// Verified batches in log order
    pub batches: Vec<Batch>,
    /// Byte length of the verified prefix
    pub valid_len: u64,
    /// Bytes after the verified prefix belonging to a torn frame
    pub torn_bytes: u64,
}

impl Replay {
    pub fn has_torn_tail(&self) -> bool {
        self.torn_bytes > 0
    }

    /// Highest sequence seen, 0 for an empty log
    pub fn last_sequence(&self) -> u64 {
        self.batches.last().map(|b| b.sequence).unwrap_or(0)
    }
}

/// Sequential reader over the bytes of one commit log.
pub struct LogReader {
    data: Vec<u8>,
    current_offset: usize,
    last_sequence: Option<u64>,
    torn: bool,
}

impl LogReader {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            current_offset: 0,
            last_sequence: None,
            torn: false,
        }
    }

    /// Reads the log file at `path`. A missing file reads as an empty log.
    pub fn open(path: &Path) -> StorageResult<Self> {
        match fs::read(path) {
            Ok(data) => Ok(Self::from_bytes(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::from_bytes(Vec::new())),
            Err(e) => Err(StorageError::read_failed(
                format!("Failed to read commit log: {}", path.display()),
                e,
            )),
        }
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset as u64
    }

    /// Reads the next batch.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(batch))` if a verified frame was read
    /// - `Ok(None)` at end of log or at a torn final frame
    /// - `Err(GRC_DATA_CORRUPTION)` if a complete frame fails verification
    pub fn read_next(&mut self) -> StorageResult<Option<Batch>> {
        if self.torn || self.current_offset >= self.data.len() {
            return Ok(None);
        }

        let offset = self.current_offset as u64;
        match frame::decode(&self.data[self.current_offset..]) {
            Ok((batch, consumed)) => {
                if let Some(previous) = self.last_sequence {
                    if batch.sequence <= previous {
                        return Err(StorageError::corruption_in_batch(
                            batch.sequence,
                            format!(
                                "Sequence regression at byte {}: previous {}",
                                offset, previous
                            ),
                        ));
                    }
                }
                self.last_sequence = Some(batch.sequence);
                self.current_offset += consumed;
                Ok(Some(batch))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                // a verifiable frame after the short one means its length
                // field was damaged, not that the write was torn
                let tail = &self.data[self.current_offset..];
                if let Some(next) = frame::find_frame(&tail[1..]) {
                    let next = offset + 1 + next as u64;
                    return Err(StorageError::corruption_at_offset(
                        offset,
                        format!("{}; intact frame follows at byte {}", e, next),
                    ));
                }
                self.torn = true;
                Ok(None)
            }
            Err(e) => Err(StorageError::corruption_at_offset(offset, e.to_string())),
        }
    }

    /// Reads every verified batch.
    ///
    /// Any corruption causes immediate failure.
    pub fn read_all(mut self) -> StorageResult<Replay> {
        let mut batches = Vec::new();
        while let Some(batch) = self.read_next()? {
            batches.push(batch);
        }

        let valid_len = self.current_offset as u64;
        Ok(Replay {
            batches,
            valid_len,
            torn_bytes: self.data.len() as u64 - valid_len,
        })
    }
}
