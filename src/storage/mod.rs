//! Commit log substrate for grcstore
//!
//! Every change to the dataset is a batch of mutations appended to a
//! checksummed commit log. The in-memory dataset is rebuilt by replaying the
//! log on open.
//!
//! # Design Principles
//!
//! - Append-only (no in-place updates; compaction rewrites via temp + rename)
//! - Checksum-verified on every read
//! - One batch per logical write; a batch is all-or-nothing on replay
//! - Torn final frames are discarded, corrupt complete frames halt the open
//!
//! # Invariants
//!
//! - Batch sequences strictly increase
//! - Memory state is changed only after the batch append succeeds

mod backend;
mod batch;
mod checksum;
mod errors;
mod frame;
mod reader;
mod writer;

pub use backend::{FileBackend, LogBackend, MemoryBackend, LOG_EXTENSION};
pub use batch::{Batch, Mutation};
pub use checksum::compute_checksum;
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use frame::{FRAME_OVERHEAD, MAX_FRAME_LEN};
pub use reader::{LogReader, Replay};
pub use writer::LogWriter;
