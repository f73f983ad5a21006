//! Short-lived snapshot cache in front of a queue feed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

use super::QueueFeed;
use crate::error::FeedResult;
use crate::snapshot::{StoreId, StoreQueueSnapshot};

/// Default time a queue snapshot is reused.
pub const DEFAULT_QUEUE_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    stored_at: Instant,
    snapshot: StoreQueueSnapshot,
}

/// Caches successful snapshots per store for `ttl`.
///
/// Failures are never cached, so the next caller retries upstream.
pub struct CachedFeed<F> {
    inner: F,
    ttl: Duration,
    entries: Mutex<HashMap<StoreId, CacheEntry>>,
}

impl<F: QueueFeed> CachedFeed<F> {
    /// Wraps `inner` with the given TTL.
    pub fn new(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped feed.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    async fn cached(&self, store_id: &StoreId) -> Option<StoreQueueSnapshot> {
        let entries = self.entries.lock().await;
        entries
            .get(store_id)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.snapshot.clone())
    }
}

#[async_trait]
impl<F: QueueFeed> QueueFeed for CachedFeed<F> {
    async fn fetch(&self, store_id: &StoreId) -> FeedResult<StoreQueueSnapshot> {
        if let Some(snapshot) = self.cached(store_id).await {
            trace!(store_id = %store_id, "queue cache hit");
            return Ok(snapshot);
        }

        let snapshot = self.inner.fetch(store_id).await?;

        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        entries.insert(
            store_id.clone(),
            CacheEntry {
                stored_at: Instant::now(),
                snapshot: snapshot.clone(),
            },
        );

        Ok(snapshot)
    }
}
