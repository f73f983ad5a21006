//! Store identifiers and queue snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A patron's ticket number, as printed on the paper ticket.
pub type TicketNumber = u32;

/// Identifier of a store in the upstream directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(String);

impl StoreId {
    /// Creates a store id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StoreId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StoreId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for StoreId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl AsRef<str> for StoreId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether a store is taking patrons, as far as the feed can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    /// Upstream says the store is open.
    Open,
    /// Upstream says the store is closed.
    Closed,
    /// Upstream gave no status; an empty ticket list is ambiguous.
    #[default]
    Unknown,
}

impl StoreStatus {
    /// Maps the upstream `storeStatus` field.
    pub fn from_upstream(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()) {
            None => StoreStatus::Unknown,
            Some(s) if s.is_empty() => StoreStatus::Unknown,
            Some(s) if s == "OPEN" => StoreStatus::Open,
            Some(_) => StoreStatus::Closed,
        }
    }
}

/// Tickets a store is serving at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreQueueSnapshot {
    /// Store the snapshot belongs to.
    pub store_id: StoreId,
    /// Ticket numbers currently being called, in feed order.
    pub active_tickets: Vec<TicketNumber>,
    /// Open/closed signal from the store directory.
    pub status: StoreStatus,
    /// When the snapshot was read from upstream.
    pub fetched_at: DateTime<Utc>,
}

impl StoreQueueSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(store_id: impl Into<StoreId>, active_tickets: Vec<TicketNumber>, status: StoreStatus) -> Self {
        Self {
            store_id: store_id.into(),
            active_tickets,
            status,
            fetched_at: Utc::now(),
        }
    }

    /// Convenience constructor for an explicitly closed store.
    pub fn closed(store_id: impl Into<StoreId>) -> Self {
        Self::new(store_id, Vec::new(), StoreStatus::Closed)
    }

    /// Highest ticket currently being served.
    pub fn max_ticket(&self) -> Option<TicketNumber> {
        self.active_tickets.iter().copied().max()
    }

    /// True if nobody is being served.
    pub fn is_empty(&self) -> bool {
        self.active_tickets.is_empty()
    }

    /// True if upstream explicitly reported the store closed.
    pub fn is_closed(&self) -> bool {
        self.status == StoreStatus::Closed
    }

    /// Tables left before `ticket` is called. Zero or negative means now.
    pub fn tables_remaining(&self, ticket: TicketNumber) -> Option<i64> {
        self.max_ticket()
            .map(|max| i64::from(ticket) - i64::from(max))
    }

    /// Tickets joined for display, e.g. `301, 302`.
    pub fn queue_text(&self) -> String {
        self.active_tickets
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
