//! Queue progress monitors for tablecall.
//!
//! - [`Monitor`]: the recurring check for one chat's ticket
//! - [`MonitorRegistry`]: at most one monitor per chat, with start, cancel
//!   and lookup
//! - [`NotificationSink`]: where notices go
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tablecall_core::feed::sushiro::DEFAULT_API_BASE;
//! use tablecall_core::{CachedFeed, Language, StoreId, SushiroClient};
//! use tablecall_monitor::{MonitorConfig, MonitorRegistry};
//!
//! let feed = Arc::new(CachedFeed::new(SushiroClient::new(DEFAULT_API_BASE)?, ttl));
//! let registry = MonitorRegistry::new(feed, sink, MonitorConfig::default());
//!
//! registry.start(chat_id, StoreId::from("12"), 50, Language::En).await?;
//! // later
//! registry.cancel(chat_id).await;
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod monitor;
pub mod registry;
pub mod sink;

pub use config::{MonitorConfig, MIN_POLL_INTERVAL};
pub use error::{MonitorError, Result};
pub use event::MonitorEvent;
pub use monitor::{CompletionReason, Monitor, MonitorPhase, MonitorState, TickOutcome};
pub use registry::{MonitorHandle, MonitorRegistry};
pub use sink::{Notification, NotificationSink, TextFormat};
