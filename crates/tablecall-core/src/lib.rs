//! Core types for tablecall.
//!
//! - [`StoreQueueSnapshot`]: tickets a store is serving at one moment
//! - [`AlertThresholds`] and [`classify`]: map tables remaining to an
//!   [`AlertStage`]
//! - [`feed`]: the [`QueueFeed`] trait, a TTL cache and the HTTP client
//! - [`locale`]: user-facing texts per [`Language`]
//! - [`config`]: state and config paths

pub mod config;
pub mod error;
pub mod feed;
pub mod locale;
pub mod snapshot;
pub mod stage;

pub use error::{CoreError, FeedError, FeedResult, Result};
pub use feed::{CachedFeed, QueueFeed, StoreDirectory, StoreInfo, SushiroClient};
pub use locale::{html_escape, Language, Messages};
pub use snapshot::{StoreId, StoreQueueSnapshot, StoreStatus, TicketNumber};
pub use stage::{classify, AlertStage, AlertThresholds, DEFAULT_THRESHOLDS};
