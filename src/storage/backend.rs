//! Log backends: where committed batches live.
//!
//! The store talks to one `LogBackend`. `FileBackend` keeps the log on disk
//! at `<data_dir>/<name>.grclog`; `MemoryBackend` keeps the same frames in a
//! shared buffer and can inject write failures.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::batch::Batch;
use super::errors::{StorageError, StorageResult};
use super::frame;
use super::reader::{LogReader, Replay};
use super::writer::LogWriter;
use crate::observability::{log_event, Event};

/// Extension of commit log files
pub const LOG_EXTENSION: &str = "grclog";

/// Durable home of the commit log.
///
/// `append` must either persist the whole batch or return an error; a
/// partially persisted batch must read back as a torn tail.
pub trait LogBackend: Send {
    /// Reads every committed batch in order, discarding a torn tail.
    fn load(&mut self) -> StorageResult<Vec<Batch>>;

    /// Appends one batch.
    fn append(&mut self, batch: &Batch) -> StorageResult<()>;

    /// Atomically replaces the whole log with `batches`.
    fn rewrite(&mut self, batches: &[Batch]) -> StorageResult<()>;

    /// Human-readable location, used in log lines
    fn describe(&self) -> String;
}

fn report_replay(location: &str, replay: &Replay) {
    if replay.has_torn_tail() {
        log_event(
            Event::LogTornTailDiscarded,
            &[
                ("log", location),
                ("valid_len", &replay.valid_len.to_string()),
                ("discarded_bytes", &replay.torn_bytes.to_string()),
            ],
        );
    }
    log_event(
        Event::LogReplayComplete,
        &[
            ("log", location),
            ("batches", &replay.batches.len().to_string()),
            ("last_sequence", &replay.last_sequence().to_string()),
        ],
    );
}

fn report_corruption(location: &str, err: &StorageError) {
    if err.is_fatal() {
        log_event(
            Event::LogCorruption,
            &[("log", location), ("error", &err.to_string())],
        );
    }
}

// ============================================================================
// File backend
// ============================================================================

/// Commit log stored as a single append-only file.
pub struct FileBackend {
    path: PathBuf,
    writer: LogWriter,
    sync: bool,
}

impl FileBackend {
    /// Path of the log for database `name` under `data_dir`
    pub fn log_path(data_dir: &Path, name: &str) -> PathBuf {
        data_dir.join(format!("{}.{}", name, LOG_EXTENSION))
    }

    /// Opens or creates the log. With `sync` every append is fsynced.
    pub fn open(data_dir: &Path, name: &str, sync: bool) -> StorageResult<Self> {
        let path = Self::log_path(data_dir, name);
        let writer = LogWriter::open(&path, sync)?;
        Ok(Self { path, writer, sync })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl LogBackend for FileBackend {
    fn load(&mut self) -> StorageResult<Vec<Batch>> {
        let location = self.describe();
        let replay = LogReader::open(&self.path)?.read_all().map_err(|e| {
            report_corruption(&location, &e);
            e
        })?;

        if replay.has_torn_tail() {
            self.writer.truncate(replay.valid_len)?;
        }
        report_replay(&location, &replay);
        Ok(replay.batches)
    }

    fn append(&mut self, batch: &Batch) -> StorageResult<()> {
        let encoded = frame::encode(batch)?;
        self.writer.append(&encoded)
    }

    /// Write to temp file, fsync, rename over the log, fsync the directory.
    fn rewrite(&mut self, batches: &[Batch]) -> StorageResult<()> {
        let temp_path = self.temp_path();

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| {
                StorageError::io_error(
                    format!("Failed to create temp log: {}", temp_path.display()),
                    e,
                )
            })?;

        for batch in batches {
            let encoded = frame::encode(batch)?;
            file.write_all(&encoded).map_err(|e| {
                StorageError::write_failed(format!("Failed to write temp log batch {}", batch.sequence), e)
            })?;
        }

        file.sync_all()
            .map_err(|e| StorageError::write_failed("Failed to fsync temp log", e))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| {
            StorageError::io_error(
                format!("Failed to commit rewritten log: {}", self.path.display()),
                e,
            )
        })?;

        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        self.writer = LogWriter::open(&self.path, self.sync)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// Memory backend
// ============================================================================

#[derive(Debug, Default)]
struct MemoryLog {
    bytes: Mutex<Vec<u8>>,
    failing_writes: AtomicUsize,
}

/// In-memory commit log.
///
/// Clones share the same buffer, so a clone handed to one store can be
/// reopened by another to simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    log: Arc<MemoryLog>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn bytes(&self) -> StorageResult<MutexGuard<'_, Vec<u8>>> {
        self.log
            .bytes
            .lock()
            .map_err(|_| StorageError::internal("memory log lock poisoned"))
    }

    /// Makes the next `n` appends or rewrites fail without writing anything.
    pub fn fail_next_writes(&self, n: usize) {
        self.log.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Total bytes held, including any torn tail
    pub fn len_bytes(&self) -> usize {
        self.bytes().map(|b| b.len()).unwrap_or(0)
    }

    /// Appends raw bytes after the last frame.
    pub fn append_raw(&self, raw: &[u8]) -> StorageResult<()> {
        self.bytes()?.extend_from_slice(raw);
        Ok(())
    }

    fn take_injected_failure(&self) -> StorageResult<()> {
        let injected = self
            .log
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            Err(StorageError::write_failed_no_source("injected write failure"))
        } else {
            Ok(())
        }
    }
}

impl LogBackend for MemoryBackend {
    fn load(&mut self) -> StorageResult<Vec<Batch>> {
        let location = self.describe();
        let mut bytes = self.bytes()?;
        let replay = LogReader::from_bytes(bytes.clone()).read_all().map_err(|e| {
            report_corruption(&location, &e);
            e
        })?;

        if replay.has_torn_tail() {
            bytes.truncate(replay.valid_len as usize);
        }
        report_replay(&location, &replay);
        Ok(replay.batches)
    }

    fn append(&mut self, batch: &Batch) -> StorageResult<()> {
        self.take_injected_failure()?;
        let encoded = frame::encode(batch)?;
        self.bytes()?.extend_from_slice(&encoded);
        Ok(())
    }

    fn rewrite(&mut self, batches: &[Batch]) -> StorageResult<()> {
        self.take_injected_failure()?;
        let mut fresh = Vec::new();
        for batch in batches {
            fresh.extend(frame::encode(batch)?);
        }
        *self.bytes()? = fresh;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
