//! Main Telegram bot implementation.

use std::sync::Arc;

use tablecall_core::{CachedFeed, QueueFeed, StoreDirectory, SushiroClient};
use tablecall_monitor::{MonitorEvent, MonitorRegistry};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::error::{Result, TelegramError};
use crate::handlers::{handle_callback, handle_command, handle_message, help_text, Command};
use crate::notifier::TelegramNotifier;
use crate::settings::BotSettings;
use crate::state::{BotState, SESSION_IDLE_TTL};

/// How often idle sessions are swept.
const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// The tablecall Telegram bot.
pub struct TablecallBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<BotState>,
}

impl TablecallBot {
    /// Create a bot talking to the queue API at `settings.api_base`.
    pub fn new(settings: BotSettings) -> Result<Self> {
        if settings.token.is_empty() {
            return Err(TelegramError::NoToken);
        }

        let bot = Bot::new(&settings.token);
        let client = Arc::new(SushiroClient::new(&settings.api_base)?);
        let directory: Arc<dyn StoreDirectory> = client.clone();
        let feed: Arc<dyn QueueFeed> = Arc::new(CachedFeed::new(client, settings.queue_ttl));
        let sink = Arc::new(TelegramNotifier::new(bot.clone()));
        let registry = MonitorRegistry::new(Arc::clone(&feed), sink, settings.monitor.clone());
        let state = Arc::new(BotState::new(directory, feed, registry));

        Ok(Self::with_state(bot, state))
    }

    /// Create a bot over existing state (for testing).
    pub fn with_state(bot: Bot, state: Arc<BotState>) -> Self {
        Self { bot, state }
    }

    /// Shared handler state.
    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self.bot.get_me().await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Start the bot in polling mode. Returns after Ctrl+C, once every
    /// monitor has been cancelled.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        let bot = self.bot.clone();
        let state = Arc::clone(&self.state);

        if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %e, "Failed to register command list");
        }

        let events = state.registry().subscribe();
        tokio::spawn(log_monitor_events(events));

        let prune_state = Arc::clone(&state);
        tokio::spawn(async move {
            prune_sessions_loop(prune_state).await;
        });

        let state_for_commands = Arc::clone(&state);
        let state_for_unknown = Arc::clone(&state);
        let state_for_messages = Arc::clone(&state);
        let state_for_callbacks = Arc::clone(&state);

        let handler = dptree::entry()
            .branch(
                Update::filter_callback_query()
                    .endpoint(move |bot: Bot, q: CallbackQuery| {
                        let state = Arc::clone(&state_for_callbacks);
                        async move { handle_callback(bot, q, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                        async move { handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| {
                        msg.text()
                            .map(|t| t.starts_with('/'))
                            .unwrap_or(false)
                    })
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_unknown);
                        async move {
                            debug!(chat_id = %msg.chat.id, text = ?msg.text(), "Unrecognized command");
                            let language = state.chosen_language(msg.chat.id.0).await;
                            bot.send_message(msg.chat.id, help_text(language)).await?;
                            respond(())
                        }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some())
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_messages);
                        debug!(chat_id = %msg.chat.id, "Text message received");
                        async move { handle_message(bot, msg, state).await }
                    }),
            );

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(bot, handler)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        self.state.registry().shutdown().await;
        info!("Bot stopped");
        Ok(())
    }
}

/// Background task that forgets chats idle for [`SESSION_IDLE_TTL`].
async fn prune_sessions_loop(state: Arc<BotState>) {
    let mut ticker = interval(SESSION_PRUNE_INTERVAL);
    loop {
        ticker.tick().await;
        let removed = state.prune_sessions(SESSION_IDLE_TTL).await;
        if removed > 0 {
            info!(removed, "Forgot idle chats");
        }
    }
}

/// Logs monitor lifecycle events until the registry is dropped.
async fn log_monitor_events(mut events: broadcast::Receiver<MonitorEvent>) {
    loop {
        match events.recv().await {
            Ok(MonitorEvent::StageNotified {
                chat_id,
                stage,
                tables_remaining,
                ..
            }) => {
                info!(chat_id = %chat_id, stage = %stage, tables_remaining, "Alert sent");
            }
            Ok(MonitorEvent::Completed {
                chat_id, reason, ..
            }) => {
                info!(chat_id = %chat_id, reason = ?reason, "Monitor finished");
            }
            Ok(event) => debug!(event = ?event, "Monitor event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Monitor event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
