//! Pastecraft Core
//!
//! Core types and utilities shared across Pastecraft components.
//!
//! This crate provides:
//! - Error types and result handling
//! - The result type handed back to the paste handler
//! - The notification capability used to surface transient messages

pub mod error;
pub mod notify;
pub mod types;

pub use error::{Error, Result};
pub use notify::{LogSink, Notification, NotificationSink, NullSink, RecordingSink};
pub use types::RunResult;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::notify::{NotificationSink, RecordingSink};
    pub use crate::types::RunResult;
}
