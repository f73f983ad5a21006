//! Telegram front end for tablecall.
//!
//! Walks a chat through choosing a language, a store and a ticket number,
//! then hands the ticket to a [`tablecall_monitor::MonitorRegistry`] that
//! messages the chat as the queue approaches it.
//!
//! # Commands
//!
//! - `/start` - choose language and store, then type a ticket number
//! - `/status` - tables remaining before your ticket
//! - `/cancel` - stop monitoring
//! - `/help`, `/about`
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN`: bot token (or pass a token file)
//! - `TABLECALL_POLL_INTERVAL`: seconds between queue checks (default 30)
//! - `TABLECALL_ALERTS`: alert thresholds, e.g. `10,5,2`
//! - `TABLECALL_CLOSED_AFTER`: empty reads treated as closed (default 3)
//! - `TABLECALL_QUEUE_TTL`: seconds a queue read is reused (default 60)
//! - `TABLECALL_API_BASE`: queue API base URL

pub mod bot;
pub mod error;
pub mod handlers;
pub mod keyboards;
pub mod notifier;
pub mod session;
pub mod settings;
pub mod state;

pub use bot::TablecallBot;
pub use error::{Result, TelegramError};
pub use settings::BotSettings;
pub use state::{BotState, StatusReport, StoreSelection, TicketReply};
