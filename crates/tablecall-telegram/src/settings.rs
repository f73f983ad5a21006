//! Bot settings resolved from arguments and environment.

use std::path::Path;
use std::time::Duration;

use tablecall_core::feed::sushiro::DEFAULT_API_BASE;
use tablecall_core::feed::cache::DEFAULT_QUEUE_TTL;
use tablecall_core::AlertThresholds;
use tablecall_monitor::MonitorConfig;

use crate::error::{Result, TelegramError};

/// Everything the bot needs to start.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Telegram bot token.
    pub token: String,
    /// Queue API base URL.
    pub api_base: String,
    /// How long a queue snapshot is reused.
    pub queue_ttl: Duration,
    /// Monitor tuning.
    pub monitor: MonitorConfig,
}

impl BotSettings {
    /// Creates settings with defaults for everything but the token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            queue_ttl: DEFAULT_QUEUE_TTL,
            monitor: MonitorConfig::default(),
        }
    }

    /// Sets the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the queue cache TTL.
    pub fn with_queue_ttl(mut self, ttl: Duration) -> Self {
        self.queue_ttl = ttl;
        self
    }

    /// Sets the monitor poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.monitor = self.monitor.with_poll_interval(interval);
        self
    }

    /// Sets the alert thresholds.
    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.monitor = self.monitor.with_thresholds(thresholds);
        self
    }

    /// Sets the empty-read streak treated as closed.
    pub fn with_closed_after_empty_reads(mut self, reads: u32) -> Self {
        self.monitor = self.monitor.with_closed_after_empty_reads(reads);
        self
    }
}

/// Reads a bot token from a file, ignoring surrounding whitespace.
pub fn read_token_file(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)?.trim().to_string();
    if token.is_empty() {
        return Err(TelegramError::NoToken);
    }
    Ok(token)
}

/// Picks the token: an explicit value wins over a token file.
pub fn resolve_token(token: Option<String>, token_file: Option<&Path>) -> Result<String> {
    match token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(token) => Ok(token),
        None => match token_file {
            Some(path) => read_token_file(path),
            None => Err(TelegramError::NoToken),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_token_file_trims() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  123:abc  ").unwrap();

        assert_eq!(read_token_file(file.path()).unwrap(), "123:abc");
    }

    #[test]
    fn test_empty_token_file() {
        let file = NamedTempFile::new().unwrap();

        assert!(matches!(read_token_file(file.path()), Err(TelegramError::NoToken)));
    }

    #[test]
    fn test_missing_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_token_file(&dir.path().join("token.txt"));

        assert!(matches!(result, Err(TelegramError::IoError(_))));
    }

    #[test]
    fn test_resolve_token_precedence() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "from-file").unwrap();

        assert_eq!(
            resolve_token(Some("from-env".into()), Some(file.path())).unwrap(),
            "from-env"
        );
        assert_eq!(resolve_token(Some("  ".into()), Some(file.path())).unwrap(), "from-file");
        assert!(matches!(resolve_token(None, None), Err(TelegramError::NoToken)));
    }

    #[test]
    fn test_settings_builder() {
        let settings = BotSettings::new("t")
            .with_poll_interval(Duration::from_secs(10))
            .with_queue_ttl(Duration::from_secs(5))
            .with_closed_after_empty_reads(2);

        assert_eq!(settings.api_base, DEFAULT_API_BASE);
        assert_eq!(settings.monitor.poll_interval, Duration::from_secs(10));
        assert_eq!(settings.monitor.closed_after_empty_reads, 2);
        assert_eq!(settings.queue_ttl, Duration::from_secs(5));
    }
}
