//! Observability for grcstore
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Begin/complete scopes around store-wide operations
//!
//! Observability is read-only: it never changes the outcome of an operation.

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event with fields at the severity the event implies
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::StoreOpenBegin, &[("name", "grc")]);
        log_event(Event::LogTornTailDiscarded, &[("bytes", "7")]);
    }
}
