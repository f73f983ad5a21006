//! Delivers monitor notices through the Bot API.

use async_trait::async_trait;
use tablecall_monitor::{MonitorError, Notification, NotificationSink, TextFormat};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

/// [`NotificationSink`] that sends Telegram messages.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn deliver(&self, notification: &Notification) -> tablecall_monitor::Result<()> {
        let chat_id = ChatId(notification.chat_id);
        let request = self.bot.send_message(chat_id, notification.text.clone());
        let sent = match notification.format {
            TextFormat::Html => request.parse_mode(ParseMode::Html).await,
            TextFormat::Plain => request.await,
        };

        sent.map_err(|e| MonitorError::Delivery(e.to_string()))?;
        debug!(chat_id = %chat_id, "notification delivered");
        Ok(())
    }
}
