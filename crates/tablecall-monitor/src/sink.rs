//! Outbound notifications.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// How the transport should interpret a notification's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextFormat {
    /// Send as is.
    Plain,
    /// Telegram HTML subset; dynamic values are already escaped.
    Html,
}

/// A message for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub chat_id: i64,
    pub text: String,
    pub format: TextFormat,
}

impl Notification {
    /// Creates an HTML-formatted notification.
    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format: TextFormat::Html,
        }
    }

    /// Creates a plain-text notification.
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format: TextFormat::Plain,
        }
    }
}

/// Delivers notifications to conversations.
///
/// Monitors do not retry failed deliveries; they log and move on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}
