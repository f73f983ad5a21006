//! Live queue feeds.
//!
//! A [`QueueFeed`] returns the tickets a store is serving right now. The
//! HTTP implementation lives in [`sushiro`]; [`CachedFeed`] wraps any feed
//! with a short TTL so many monitors watching one store share a read.
//! [`StoreDirectory`] lists the stores a user can pick from.

pub mod cache;
pub mod sushiro;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{FeedError, FeedResult};
use crate::snapshot::{StoreId, StoreQueueSnapshot};

pub use cache::CachedFeed;
pub use sushiro::{parse_ticket, StoreInfo, SushiroClient};

/// Source of live queue snapshots.
#[async_trait]
pub trait QueueFeed: Send + Sync {
    /// Read the tickets currently being served at `store_id`.
    ///
    /// A closed store is a successful snapshot with
    /// [`crate::StoreStatus::Closed`], never an error.
    async fn fetch(&self, store_id: &StoreId) -> FeedResult<StoreQueueSnapshot>;
}

#[async_trait]
impl<T: QueueFeed + ?Sized> QueueFeed for Arc<T> {
    async fn fetch(&self, store_id: &StoreId) -> FeedResult<StoreQueueSnapshot> {
        (**self).fetch(store_id).await
    }
}

/// Source of the store directory.
#[async_trait]
pub trait StoreDirectory: Send + Sync {
    /// Every store, ordered by name.
    async fn stores(&self) -> FeedResult<Arc<Vec<StoreInfo>>>;

    /// One store by id.
    async fn store(&self, store_id: &StoreId) -> FeedResult<StoreInfo> {
        self.stores()
            .await?
            .iter()
            .find(|s| s.store_id() == *store_id)
            .cloned()
            .ok_or_else(|| FeedError::UnknownStore(store_id.to_string()))
    }
}
