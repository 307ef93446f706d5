//! Observable events
//!
//! Every line the engine logs names one of these events.

use std::fmt;

use super::logger::Severity;

/// Observable events in the atom lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Hydration
    /// Hydration task started
    HydrationStart,
    /// No record stored under the key, initial value kept
    HydrationEmpty,
    /// Hydration finished, value is durable-backed
    HydrationComplete,
    /// Hydration failed and no fallback recovered it
    HydrationFailed,
    /// Stored record is newer than the configured target version
    RecordVersionAhead,

    // Recovery
    /// Corrupt or unreadable record detected, recovery begins
    RecoveryStart,
    /// Backup of the corrupt artifact created
    BackupCreated,
    /// Backup of the corrupt artifact failed
    BackupFailed,
    /// Fallback producer returned a value
    FallbackApplied,
    /// Fallback producer failed
    FallbackFailed,

    // Writes
    /// Record written to the adapter
    WriteComplete,
    /// Record write failed
    WriteFailed,
    /// Automatic write will be retried
    WriteRetry,
    /// Automatic write dropped after exhausting retries
    WriteDropped,
    /// Value change rejected by the validator
    SetRejected,

    // Shutdown
    /// Shutdown flush begins
    ShutdownFlushStart,
    /// Shutdown flush finished
    ShutdownFlushComplete,
    /// Shutdown flush did not finish in the allotted time
    ShutdownFlushTimeout,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::HydrationStart => "HYDRATION_START",
            Event::HydrationEmpty => "HYDRATION_EMPTY",
            Event::HydrationComplete => "HYDRATION_COMPLETE",
            Event::HydrationFailed => "HYDRATION_FAILED",
            Event::RecordVersionAhead => "RECORD_VERSION_AHEAD",

            Event::RecoveryStart => "RECOVERY_START",
            Event::BackupCreated => "BACKUP_CREATED",
            Event::BackupFailed => "BACKUP_FAILED",
            Event::FallbackApplied => "FALLBACK_APPLIED",
            Event::FallbackFailed => "FALLBACK_FAILED",

            Event::WriteComplete => "WRITE_COMPLETE",
            Event::WriteFailed => "WRITE_FAILED",
            Event::WriteRetry => "WRITE_RETRY",
            Event::WriteDropped => "WRITE_DROPPED",
            Event::SetRejected => "SET_REJECTED",

            Event::ShutdownFlushStart => "SHUTDOWN_FLUSH_START",
            Event::ShutdownFlushComplete => "SHUTDOWN_FLUSH_COMPLETE",
            Event::ShutdownFlushTimeout => "SHUTDOWN_FLUSH_TIMEOUT",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::WriteComplete => Severity::Trace,
            Event::RecordVersionAhead
            | Event::RecoveryStart
            | Event::BackupFailed
            | Event::WriteRetry
            | Event::SetRejected
            | Event::ShutdownFlushTimeout => Severity::Warn,
            Event::FallbackFailed | Event::WriteFailed | Event::WriteDropped => Severity::Error,
            Event::HydrationFailed => Severity::Fatal,
            _ => Severity::Info,
        }
    }

    /// Returns true if the event marks an atom that will not accept writes
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
