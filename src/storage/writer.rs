//! Append-only commit log writer
//!
//! - Frames are appended, never rewritten in place
//! - With `sync` enabled every append is followed by fsync
//! - Truncation is only used to drop a torn tail found during replay

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};

/// Writer that owns the commit log file handle.
pub struct LogWriter {
    path: PathBuf,
    file: File,
    current_offset: u64,
    sync: bool,
}

impl LogWriter {
    /// Opens or creates the log at `path`, creating parent directories.
    pub fn open(path: &Path, sync: bool) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    StorageError::io_error(
                        format!("Failed to create data directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                StorageError::io_error(
                    format!("Failed to open commit log: {}", path.display()),
                    e,
                )
            })?;

        let current_offset = file
            .metadata()
            .map_err(|e| StorageError::io_error("Failed to read commit log metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            current_offset,
            sync,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends one encoded frame.
    ///
    /// # Errors
    ///
    /// Returns `GRC_STORAGE_WRITE_FAILED` if the write or fsync fails.
    ///
    /// A failed append cuts the file back to the previous end, so later
    /// frames never land behind a partial one.
    pub fn append(&mut self, frame: &[u8]) -> StorageResult<()> {
        let result = self.write_frame(frame);
        if result.is_err() {
            let _ = self.file.set_len(self.current_offset);
        } else {
            self.current_offset += frame.len() as u64;
        }
        result
    }

    fn write_frame(&mut self, frame: &[u8]) -> StorageResult<()> {
        self.file.write_all(frame).map_err(|e| {
            StorageError::write_failed(
                format!("Failed to append frame at byte {}", self.current_offset),
                e,
            )
        })?;

        if self.sync {
            self.file.sync_all().map_err(|e| {
                StorageError::write_failed(
                    format!("fsync failed after frame at byte {}", self.current_offset),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Cuts the log back to `len` bytes and syncs.
    pub fn truncate(&mut self, len: u64) -> StorageResult<()> {
        self.file.set_len(len).map_err(|e| {
            StorageError::write_failed(format!("Failed to truncate commit log to {}", len), e)
        })?;
        self.file
            .sync_all()
            .map_err(|e| StorageError::write_failed("fsync failed after truncation", e))?;
        self.current_offset = len;
        Ok(())
    }
}
