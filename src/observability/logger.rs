//! JSON-lines logging
//!
//! Every line is a single object: `event`, `severity`, then the caller's
//! fields in key order. Lines at ERROR and above go to stderr. Output below
//! the process-wide threshold (`StoreConfig::log_level`) is skipped, and a
//! failed write is ignored.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered from chattiest to most severe; the threshold compares on this order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Trace = 0,
    #[default]
    Info = 1,
    /// Something was repaired, e.g. a torn tail
    Warn = 2,
    /// The operation failed; the store is still usable
    Error = 3,
    /// The commit log cannot be trusted
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(value: u8) -> Self {
        [Severity::Trace, Severity::Info, Severity::Warn, Severity::Error]
            .get(value as usize)
            .copied()
            .unwrap_or(Severity::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// Process-wide JSON-lines logger
pub struct Logger;

impl Logger {
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Writes one line if `severity` passes the filter.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = Self::format_line(severity, event, fields);
        let _ = if severity >= Severity::Error {
            io::stderr().lock().write_all(line.as_bytes())
        } else {
            io::stdout().lock().write_all(line.as_bytes())
        };
    }

    /// `event` and `severity` lead; fields follow sorted by key. Strings are
    /// quoted through serde_json.
    fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut fields = fields.to_vec();
        fields.sort_by_key(|(key, _)| *key);

        let mut line = format!(
            "{{\"event\":{},\"severity\":\"{}\"",
            Value::from(event),
            severity
        );
        for (key, value) in fields {
            line.push_str(&format!(",{}:{}", Value::from(key), Value::from(value)));
        }
        line.push_str("}\n");
        line
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}
