//! Error types for the Telegram bot.

use tablecall_core::FeedError;
use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN or pass a token file.")]
    NoToken,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Queue API error.
    #[error("Queue feed error: {0}")]
    Feed(#[from] FeedError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
