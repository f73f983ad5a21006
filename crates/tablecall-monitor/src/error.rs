//! Error types for the monitor crate.

use thiserror::Error;

/// Errors that can occur while running monitors.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Ticket number was zero.
    #[error("invalid ticket number: {0}")]
    InvalidTicket(u32),

    /// Notification could not be delivered.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
