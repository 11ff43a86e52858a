//! User-visible notifications
//!
//! The rule engine never talks to a host UI directly. It is handed a
//! [`NotificationSink`] and calls it fire-and-forget with a message and a
//! display duration.

use parking_lot::Mutex;
use std::time::Duration;
use tracing::info;

/// Display time for the "rules applied" summary
pub const SUMMARY_NOTICE: Duration = Duration::from_millis(3000);

/// Display time for the slow-transform warning
pub const SLOW_NOTICE: Duration = Duration::from_millis(5000);

/// Display time for execution and compile failures
pub const ERROR_NOTICE: Duration = Duration::from_millis(8000);

/// Capability to surface transient messages to the user
pub trait NotificationSink: Send + Sync {
    /// Show `message` for roughly `duration`. Must not block.
    fn notify(&self, message: &str, duration: Duration);
}

impl<F> NotificationSink for F
where
    F: Fn(&str, Duration) + Send + Sync,
{
    fn notify(&self, message: &str, duration: Duration) {
        self(message, duration)
    }
}

/// Sink that forwards notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, message: &str, duration: Duration) {
        info!(duration_ms = duration.as_millis() as u64, "{}", message);
    }
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _message: &str, _duration: Duration) {}
}

/// A notification captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Message text
    pub message: String,

    /// Requested display duration
    pub duration: Duration,
}

/// Sink that keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn notifications(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    /// Just the message texts, in order
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    /// Number of recorded messages containing `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|n| n.message.contains(needle))
            .count()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, message: &str, duration: Duration) {
        self.entries.lock().push(Notification {
            message: message.to_string(),
            duration,
        });
    }
}
