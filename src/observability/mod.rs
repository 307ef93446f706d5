//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Counters
//!
//! Observability is read-only: nothing here can fail an atom operation.
//!
//! # Usage
//!
//! ```ignore
//! use persistent_atom::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::WriteFailed, &[("key", "prefs"), ("error", "disk full")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{AtomMetrics, MetricsSnapshot};

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::HydrationStart);
        log_event(Event::ShutdownFlushComplete);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::BackupFailed, &[("key", "prefs"), ("error", "denied")]);
    }
}
