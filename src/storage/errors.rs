//! Storage error types
//!
//! Error codes:
//! - GRC_STORAGE_IO_ERROR (ERROR)
//! - GRC_STORAGE_WRITE_FAILED (ERROR)
//! - GRC_STORAGE_READ_FAILED (ERROR)
//! - GRC_STORAGE_INTERNAL (ERROR)
//! - GRC_DATA_CORRUPTION (FATAL)

use std::fmt;
use std::io;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, store continues; retry is safe
    Error,
    /// Store must not continue with this dataset
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure (directory creation, metadata, rename)
    GrcStorageIoError,
    /// Commit log append or fsync failed
    GrcStorageWriteFailed,
    /// Commit log could not be read
    GrcStorageReadFailed,
    /// Lock poisoned or background task lost
    GrcStorageInternal,
    /// Checksum or decode failure on a complete frame
    GrcDataCorruption,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::GrcStorageIoError => "GRC_STORAGE_IO_ERROR",
            StorageErrorCode::GrcStorageWriteFailed => "GRC_STORAGE_WRITE_FAILED",
            StorageErrorCode::GrcStorageReadFailed => "GRC_STORAGE_READ_FAILED",
            StorageErrorCode::GrcStorageInternal => "GRC_STORAGE_INTERNAL",
            StorageErrorCode::GrcDataCorruption => "GRC_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::GrcDataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    fn with_code(code: StorageErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source,
        }
    }

    /// Generic substrate I/O failure
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StorageErrorCode::GrcStorageIoError, message, Some(source))
    }

    /// Append or fsync failed
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StorageErrorCode::GrcStorageWriteFailed, message, Some(source))
    }

    /// Write failure without an underlying I/O error (encoding, injected faults)
    pub fn write_failed_no_source(message: impl Into<String>) -> Self {
        Self::with_code(StorageErrorCode::GrcStorageWriteFailed, message, None)
    }

    /// Read failed
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StorageErrorCode::GrcStorageReadFailed, message, Some(source))
    }

    /// Internal failure: poisoned lock, lost blocking task
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(StorageErrorCode::GrcStorageInternal, message, None)
    }

    /// Data corruption (FATAL)
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::with_code(StorageErrorCode::GrcDataCorruption, message, None)
    }

    /// Data corruption with byte offset context
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::data_corruption(reason)
        }
    }

    /// Data corruption with batch sequence context
    pub fn corruption_in_batch(sequence: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("sequence: {}", sequence)),
            ..Self::data_corruption(reason)
        }
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Whether the dataset must be treated as unusable
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
