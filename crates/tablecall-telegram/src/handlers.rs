//! Telegram command, callback and message handlers.

use std::sync::Arc;

use tablecall_core::locale::{all_languages, ABOUT};
use tablecall_core::Language;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use crate::keyboards::{language_keyboard, store_keyboard, CallbackAction};
use crate::state::{BotState, StatusReport, StoreSelection, TicketReply};

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start talking to me")]
    Start,

    #[command(description = "Show your queue progress")]
    Status,

    #[command(description = "Stop talking to me")]
    Cancel,

    #[command(description = "Display the help message")]
    Help,

    #[command(description = "About this bot")]
    About,
}

/// Help text in the chat's language, or in every language if none was chosen.
pub fn help_text(language: Option<Language>) -> String {
    match language {
        Some(language) => language.messages().help.to_string(),
        None => all_languages(|m| m.help),
    }
}

/// Text sent for `/status`.
pub fn status_text(report: &StatusReport, language: Language) -> Option<String> {
    let messages = language.messages();
    match report {
        StatusReport::NoMonitor => None,
        StatusReport::Progress {
            snapshot,
            final_call: true,
            ..
        } => Some(messages.final_call_queue_now(&snapshot.queue_text())),
        StatusReport::Progress {
            snapshot,
            tables_remaining,
            ..
        } => Some(messages.still_n_tables_queue_now(&snapshot.queue_text(), *tables_remaining)),
        StatusReport::StoreClosed => Some(messages.store_closed_no_more_updates.to_string()),
        StatusReport::Unavailable => Some(messages.queue_unavailable.to_string()),
    }
}

/// Reply when the store directory cannot be read. Keeps the language
/// keyboard so tapping a language retries.
pub fn stores_unavailable_reply(language: Language) -> (&'static str, InlineKeyboardMarkup) {
    (language.messages().stores_unavailable, language_keyboard())
}

/// Reply when a store's queue cannot be read. Keeps the store keyboard so
/// the user can tap again.
pub async fn queue_unavailable_reply(
    state: &BotState,
    language: Language,
) -> (&'static str, InlineKeyboardMarkup) {
    let keyboard = match state.stores().await {
        Ok(stores) => store_keyboard(&stores),
        Err(_) => language_keyboard(),
    };
    (language.messages().queue_unavailable, keyboard)
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    state.begin(msg.chat.id.0).await;

    let text = format!(
        "{}\n\n{}",
        all_languages(|m| m.welcome),
        all_languages(|m| m.choose_language)
    );
    bot.send_message(msg.chat.id, text)
        .reply_markup(language_keyboard())
        .await?;

    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let language = state.chosen_language(msg.chat.id.0).await;
    bot.send_message(msg.chat.id, help_text(language)).await?;
    Ok(())
}

/// Handle the /about command.
pub async fn handle_about(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, ABOUT)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle the /cancel command - stop monitoring and end the dialogue.
pub async fn handle_cancel(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let language = state.language(chat_id).await;

    let had_monitor = state.cancel(chat_id).await;
    info!(chat_id = %msg.chat.id, had_monitor, "User cancelled");

    bot.send_message(msg.chat.id, language.messages().goodbye)
        .await?;
    Ok(())
}

/// Handle the /status command.
pub async fn handle_status(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let language = state.chosen_language(chat_id).await;
    let report = state.status(chat_id).await;

    match status_text(&report, language.unwrap_or_default()) {
        Some(text) => {
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, help_text(language)).await?;
        }
    }
    Ok(())
}

/// Handle inline keyboard presses.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let (Some(data), Some(message)) = (q.data.as_deref(), q.message.as_ref()) else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let Some(action) = CallbackAction::parse(data) else {
        warn!(chat_id = %chat_id, data = %data, "Unknown callback data");
        return Ok(());
    };

    match action {
        CallbackAction::Language(language) => {
            state.set_language(chat_id.0, language).await;
            let messages = language.messages();

            match state.stores().await {
                Ok(stores) => {
                    bot.edit_message_text(chat_id, message_id, messages.choose_store)
                        .reply_markup(store_keyboard(&stores))
                        .await?;
                }
                Err(e) => {
                    error!(chat_id = %chat_id, error = %e, "Failed to load store directory");
                    let (text, keyboard) = stores_unavailable_reply(language);
                    bot.edit_message_text(chat_id, message_id, text)
                        .reply_markup(keyboard)
                        .await?;
                }
            }
        }
        CallbackAction::Store(store_id) => {
            let language = state.language(chat_id.0).await;
            let messages = language.messages();

            match state.select_store(chat_id.0, &store_id).await {
                Ok(StoreSelection::Open { store, snapshot }) => {
                    bot.edit_message_text(
                        chat_id,
                        message_id,
                        messages.store_info(&store.name, &snapshot.queue_text()),
                    )
                    .parse_mode(ParseMode::Html)
                    .await?;
                    bot.send_message(chat_id, messages.ask_ticket_number).await?;
                }
                Ok(StoreSelection::Closed(store)) => {
                    bot.edit_message_text(chat_id, message_id, messages.store_closed(&store.name))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Err(e) => {
                    error!(chat_id = %chat_id, store_id = %store_id, error = %e, "Failed to read store");
                    let (text, keyboard) = queue_unavailable_reply(&state, language).await;
                    bot.edit_message_text(chat_id, message_id, text)
                        .reply_markup(keyboard)
                        .await?;
                }
            }
        }
    }

    Ok(())
}

/// Handle plain text: a ticket number when one is expected, else help.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;
    let language = state.chosen_language(chat_id).await;
    let messages = language.unwrap_or_default().messages();

    let reply = match state.submit_ticket(chat_id, text).await {
        Ok(TicketReply::Started(ticket)) => {
            info!(chat_id = %msg.chat.id, ticket, "Monitoring started");
            messages.entered_queue_please_wait(ticket)
        }
        Ok(TicketReply::Invalid) => messages.bad_ticket_input.to_string(),
        Ok(TicketReply::NotExpected) => help_text(language),
        Err(e) => {
            error!(chat_id = %msg.chat.id, error = %e, "Failed to start monitor");
            messages.bad_ticket_input.to_string()
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Main command dispatcher.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await,
        Command::Status => handle_status(bot, msg, state).await,
        Command::Cancel => handle_cancel(bot, msg, state).await,
        Command::Help => handle_help(bot, msg, state).await,
        Command::About => handle_about(bot, msg).await,
    }
}
