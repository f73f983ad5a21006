//! Monitor configuration.

use std::time::Duration;

use tablecall_core::AlertThresholds;

/// Shortest allowed time between two checks.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration shared by every monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between two queue checks of one monitor.
    pub poll_interval: Duration,
    /// Alert stage boundaries.
    pub thresholds: AlertThresholds,
    /// Consecutive empty reads without a store status that count as closed.
    pub closed_after_empty_reads: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            thresholds: AlertThresholds::default(),
            closed_after_empty_reads: 3,
        }
    }
}

impl MonitorConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval (at least [`MIN_POLL_INTERVAL`]).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Sets the alert thresholds.
    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Sets the empty-read streak treated as closed (at least 1).
    pub fn with_closed_after_empty_reads(mut self, reads: u32) -> Self {
        self.closed_after_empty_reads = reads.max(1);
        self
    }
}
