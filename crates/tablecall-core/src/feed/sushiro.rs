//! HTTP client for the Sushiro queue API.
//!
//! Two endpoints are used:
//! - `/info/storelist` for the store directory (names, locations, status)
//! - `/remote/storequeue` for the tickets a store is calling, as strings
//!   like `"301-A"` where the part before the first `-` is the number

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::{QueueFeed, StoreDirectory};
use crate::error::{FeedError, FeedResult};
use crate::snapshot::{StoreId, StoreQueueSnapshot, StoreStatus, TicketNumber};

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://sushipass.sushiro.com.hk/api/1.1";

/// How long the store directory is reused.
pub const DIRECTORY_TTL: Duration = Duration::from_secs(600);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Directory search origin (Tsim Sha Tsui).
const DEFAULT_LATITUDE: f64 = 22.307338;
const DEFAULT_LONGITUDE: f64 = 114.171603;

const DIRECTORY_RESULTS: u32 = 100;

/// A store as listed in the directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    /// Upstream numeric id.
    pub id: u64,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Raw upstream status, e.g. `OPEN`.
    #[serde(default)]
    pub store_status: Option<String>,
}

impl StoreInfo {
    /// Store id in our own type.
    pub fn store_id(&self) -> StoreId {
        StoreId::from(self.id)
    }

    /// Parsed open/closed status.
    pub fn status(&self) -> StoreStatus {
        StoreStatus::from_upstream(self.store_status.as_deref())
    }
}

struct DirectoryCache {
    fetched_at: Instant,
    stores: Arc<Vec<StoreInfo>>,
}

/// Client for the store directory and live queue endpoints.
pub struct SushiroClient {
    client: reqwest::Client,
    base: Url,
    directory: RwLock<Option<DirectoryCache>>,
}

impl SushiroClient {
    /// Creates a client against `base` (see [`DEFAULT_API_BASE`]).
    pub fn new(base: &str) -> FeedResult<Self> {
        let base = Url::parse(base)
            .map_err(|e| FeedError::Unreachable(format!("invalid API base {base}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base,
            directory: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    /// All stores, served from cache for [`DIRECTORY_TTL`].
    pub async fn stores(&self) -> FeedResult<Arc<Vec<StoreInfo>>> {
        {
            let cache = self.directory.read().await;
            if let Some(cache) = cache.as_ref() {
                if cache.fetched_at.elapsed() < DIRECTORY_TTL {
                    return Ok(Arc::clone(&cache.stores));
                }
            }
        }
        self.refresh_stores().await
    }

    /// Reads the directory from upstream, bypassing the cache.
    pub async fn refresh_stores(&self) -> FeedResult<Arc<Vec<StoreInfo>>> {
        let url = self.endpoint("/info/storelist");
        let guid = Uuid::new_v4().to_string();
        let latitude = DEFAULT_LATITUDE.to_string();
        let longitude = DEFAULT_LONGITUDE.to_string();
        let numresults = DIRECTORY_RESULTS.to_string();

        let body = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("numresults", numresults.as_str()),
                ("guid", guid.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let stores = Arc::new(parse_store_list(&body)?);
        debug!(count = stores.len(), "store directory refreshed");

        let mut cache = self.directory.write().await;
        *cache = Some(DirectoryCache {
            fetched_at: Instant::now(),
            stores: Arc::clone(&stores),
        });

        Ok(stores)
    }

    async fn fetch_queue(&self, store_id: &StoreId) -> FeedResult<Vec<TicketNumber>> {
        let url = self.endpoint("/remote/storequeue");
        let body = self
            .client
            .get(&url)
            .query(&[("storeid", store_id.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_queue(&body)
    }

    /// Status for an empty queue. Uses a fresh directory read so a store
    /// that just closed is not reported open from a ten minute old cache.
    async fn status_when_empty(&self, store_id: &StoreId) -> StoreStatus {
        match self.refresh_stores().await {
            Ok(stores) => stores
                .iter()
                .find(|s| s.store_id() == *store_id)
                .map(StoreInfo::status)
                .unwrap_or(StoreStatus::Unknown),
            Err(e) => {
                warn!(store_id = %store_id, error = %e, "could not read store status");
                StoreStatus::Unknown
            }
        }
    }
}

#[async_trait]
impl QueueFeed for SushiroClient {
    async fn fetch(&self, store_id: &StoreId) -> FeedResult<StoreQueueSnapshot> {
        let tickets = self.fetch_queue(store_id).await?;

        let status = if tickets.is_empty() {
            self.status_when_empty(store_id).await
        } else {
            StoreStatus::Open
        };

        debug!(
            store_id = %store_id,
            tickets = tickets.len(),
            status = ?status,
            "queue fetched"
        );

        Ok(StoreQueueSnapshot::new(store_id.clone(), tickets, status))
    }
}

#[async_trait]
impl StoreDirectory for SushiroClient {
    async fn stores(&self) -> FeedResult<Arc<Vec<StoreInfo>>> {
        SushiroClient::stores(self).await
    }
}

/// Parses the leading number of an upstream ticket string.
pub fn parse_ticket(raw: &str) -> FeedResult<TicketNumber> {
    let number = raw.split('-').next().unwrap_or_default().trim();
    number
        .parse()
        .map_err(|_| FeedError::Malformed(format!("ticket {raw:?}")))
}

/// Parses the queue endpoint body. `null` and `[]` both mean no tickets.
pub fn parse_queue(body: &str) -> FeedResult<Vec<TicketNumber>> {
    let raw: Option<Vec<String>> = serde_json::from_str(body)?;
    raw.unwrap_or_default()
        .iter()
        .map(|s| parse_ticket(s))
        .collect()
}

/// Parses the store list body, sorted by name.
pub fn parse_store_list(body: &str) -> FeedResult<Vec<StoreInfo>> {
    let mut stores: Vec<StoreInfo> = serde_json::from_str(body)?;
    stores.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(stores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticket() {
        assert_eq!(parse_ticket("301-A").unwrap(), 301);
        assert_eq!(parse_ticket("42").unwrap(), 42);
        assert_eq!(parse_ticket(" 7-x-y").unwrap(), 7);
        assert!(matches!(parse_ticket("A-301"), Err(FeedError::Malformed(_))));
        assert!(parse_ticket("").is_err());
    }

    #[test]
    fn test_parse_queue() {
        assert_eq!(parse_queue(r#"["301-A","302-B"]"#).unwrap(), vec![301, 302]);
        assert!(parse_queue("[]").unwrap().is_empty());
        assert!(parse_queue("null").unwrap().is_empty());
        assert!(matches!(parse_queue("{\"oops\":1}"), Err(FeedError::Malformed(_))));
        assert!(matches!(parse_queue(r#"["x-1"]"#), Err(FeedError::Malformed(_))));
    }

    #[test]
    fn test_parse_store_list() {
        let body = r#"[
            {"id": 2, "name": "Tsuen Wan", "latitude": 22.37, "longitude": 114.11, "storeStatus": "OPEN"},
            {"id": 1, "name": "Mong Kok", "latitude": 22.31, "longitude": 114.17, "storeStatus": "CLOSED"},
            {"id": 3, "name": "Central"}
        ]"#;
        let stores = parse_store_list(body).unwrap();

        let names: Vec<_> = stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Central", "Mong Kok", "Tsuen Wan"]);
        assert_eq!(stores[0].status(), StoreStatus::Unknown);
        assert_eq!(stores[1].status(), StoreStatus::Closed);
        assert_eq!(stores[2].status(), StoreStatus::Open);
        assert_eq!(stores[2].store_id(), StoreId::from("2"));
    }

    #[test]
    fn test_client_rejects_bad_base() {
        assert!(SushiroClient::new("not a url").is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let client = SushiroClient::new("https://example.com/api/1.1/").unwrap();
        assert_eq!(
            client.endpoint("/remote/storequeue"),
            "https://example.com/api/1.1/remote/storequeue"
        );
    }
}
