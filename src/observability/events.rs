//! Observable lifecycle events
//!
//! Events are explicit and typed. Per-record CRUD is not an event; only
//! store-wide transitions are.

use std::fmt;

/// Observable events in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Open & lifecycle
    /// Store open begins
    StoreOpenBegin,
    /// Store open complete, ready to serve
    StoreOpenComplete,
    /// Store open failed
    StoreOpenFailed,

    // Commit log
    /// Log replay complete
    LogReplayComplete,
    /// A truncated trailing frame was discarded during replay
    LogTornTailDiscarded,
    /// Log corruption detected (FATAL)
    LogCorruption,
    /// Log rewritten as a single snapshot batch
    CompactionComplete,

    // Migration
    /// Dataset already at target shape
    MigrationNotNeeded,

    // Seeding
    /// Marker present, seeding skipped
    SeedSkipped,
    /// Seed state transition
    SeedStateChanged,
}

impl Event {
    /// Returns the event name as it appears in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpenBegin => "STORE_OPEN_BEGIN",
            Event::StoreOpenComplete => "STORE_OPEN_COMPLETE",
            Event::StoreOpenFailed => "STORE_OPEN_FAILED",
            Event::LogReplayComplete => "LOG_REPLAY_COMPLETE",
            Event::LogTornTailDiscarded => "LOG_TORN_TAIL_DISCARDED",
            Event::LogCorruption => "LOG_CORRUPTION",
            Event::CompactionComplete => "COMPACTION_COMPLETE",
            Event::MigrationNotNeeded => "MIGRATION_NOT_NEEDED",
            Event::SeedSkipped => "SEED_SKIPPED",
            Event::SeedStateChanged => "SEED_STATE_CHANGED",
        }
    }

    /// Whether this event means the store cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::LogCorruption)
    }

    /// Whether this event signals a recoverable anomaly
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::LogTornTailDiscarded)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake() {
        let events = [
            Event::StoreOpenBegin,
            Event::StoreOpenComplete,
            Event::StoreOpenFailed,
            Event::LogReplayComplete,
            Event::LogTornTailDiscarded,
            Event::LogCorruption,
            Event::CompactionComplete,
            Event::MigrationNotNeeded,
            Event::SeedSkipped,
            Event::SeedStateChanged,
        ];
        for event in events {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::LogCorruption.is_fatal());
        assert!(!Event::SeedSkipped.is_fatal());
        assert!(!Event::StoreOpenFailed.is_fatal());
        assert!(Event::LogTornTailDiscarded.is_warning());
    }
}
