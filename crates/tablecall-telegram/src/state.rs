//! Shared state for the Telegram bot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tablecall_core::{
    FeedResult, Language, QueueFeed, StoreDirectory, StoreId, StoreInfo, StoreQueueSnapshot,
    TicketNumber,
};
use tablecall_monitor::{MonitorRegistry, MonitorState};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::session::{parse_ticket_input, ConversationStage, StoreChoice, UserSession};

/// Idle sessions untouched this long are forgotten.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of picking a store.
#[derive(Debug, Clone)]
pub enum StoreSelection {
    /// Store is serving; the chat now waits for a ticket number.
    Open {
        store: StoreInfo,
        snapshot: StoreQueueSnapshot,
    },
    /// Store is closed or not calling anyone; the dialogue ends.
    Closed(StoreInfo),
}

/// Result of a text message sent while a ticket may be expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketReply {
    /// The chat is not being asked for a ticket.
    NotExpected,
    /// Not a positive integer; still waiting.
    Invalid,
    /// Monitoring started for this ticket.
    Started(TicketNumber),
}

/// What `/status` has to say.
#[derive(Debug, Clone)]
pub enum StatusReport {
    /// No active monitor for the chat.
    NoMonitor,
    /// The store is calling tickets.
    Progress {
        snapshot: StoreQueueSnapshot,
        tables_remaining: i64,
        /// Within the terminal alert stage.
        final_call: bool,
    },
    /// The store reports closed.
    StoreClosed,
    /// The queue could not be read, or is empty.
    Unavailable,
}

/// State shared by every handler.
pub struct BotState {
    sessions: RwLock<HashMap<i64, UserSession>>,
    directory: Arc<dyn StoreDirectory>,
    feed: Arc<dyn QueueFeed>,
    registry: MonitorRegistry,
}

impl BotState {
    pub fn new(
        directory: Arc<dyn StoreDirectory>,
        feed: Arc<dyn QueueFeed>,
        registry: MonitorRegistry,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            directory,
            feed,
            registry,
        }
    }

    /// The monitor registry.
    pub fn registry(&self) -> &MonitorRegistry {
        &self.registry
    }

    /// Copy of the chat's session (default if none).
    pub async fn session(&self, chat_id: i64) -> UserSession {
        self.sessions
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Language chosen by the chat, or the default.
    pub async fn language(&self, chat_id: i64) -> Language {
        self.session(chat_id).await.language_or_default()
    }

    /// Language chosen by the chat, if any.
    pub async fn chosen_language(&self, chat_id: i64) -> Option<Language> {
        self.session(chat_id).await.language
    }

    async fn update_session<R>(&self, chat_id: i64, f: impl FnOnce(&mut UserSession) -> R) -> R {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(chat_id).or_default();
        session.touch();
        f(session)
    }

    /// Number of chats with a session.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Forgets idle sessions untouched for `max_idle`, unless the chat still
    /// has an active monitor. Returns how many were removed.
    pub async fn prune_sessions(&self, max_idle: Duration) -> usize {
        let stale: Vec<i64> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, s)| s.is_stale(max_idle))
                .map(|(chat_id, _)| *chat_id)
                .collect()
        };

        let mut removable = Vec::with_capacity(stale.len());
        for chat_id in stale {
            if self.registry.lookup(chat_id).await.is_none() {
                removable.push(chat_id);
            }
        }

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        for chat_id in removable {
            // may have been touched since the first pass
            if sessions.get(&chat_id).is_some_and(|s| s.is_stale(max_idle)) {
                sessions.remove(&chat_id);
            }
        }
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "pruned idle sessions");
        }
        removed
    }

    /// Starts the dialogue over.
    pub async fn begin(&self, chat_id: i64) {
        self.update_session(chat_id, UserSession::restart).await;
        debug!(chat_id = %chat_id, "conversation started");
    }

    /// Records the chat's language; the store keyboard comes next.
    pub async fn set_language(&self, chat_id: i64, language: Language) {
        self.update_session(chat_id, |s| {
            s.language = Some(language);
            s.stage = ConversationStage::ChoosingStore;
        })
        .await;
        debug!(chat_id = %chat_id, language = %language, "language chosen");
    }

    /// Store directory, ordered by name.
    pub async fn stores(&self) -> FeedResult<Arc<Vec<StoreInfo>>> {
        self.directory.stores().await
    }

    /// Picks a store and reads its queue.
    ///
    /// On a feed error the session is left unchanged so the user can tap again.
    pub async fn select_store(&self, chat_id: i64, store_id: &StoreId) -> FeedResult<StoreSelection> {
        let store = self.directory.store(store_id).await?;
        let snapshot = self.feed.fetch(store_id).await?;

        if snapshot.is_closed() || snapshot.is_empty() {
            self.update_session(chat_id, UserSession::end).await;
            info!(chat_id = %chat_id, store_id = %store_id, "chosen store is closed");
            return Ok(StoreSelection::Closed(store));
        }

        let choice = StoreChoice {
            id: store_id.clone(),
            name: store.name.clone(),
        };
        self.update_session(chat_id, |s| {
            s.store = Some(choice);
            s.stage = ConversationStage::AwaitingTicket;
        })
        .await;
        debug!(chat_id = %chat_id, store_id = %store_id, "store chosen");

        Ok(StoreSelection::Open { store, snapshot })
    }

    /// Handles text typed by the user while a ticket number may be expected.
    pub async fn submit_ticket(
        &self,
        chat_id: i64,
        text: &str,
    ) -> tablecall_monitor::Result<TicketReply> {
        let session = self.session(chat_id).await;
        let store = match (&session.stage, &session.store) {
            (ConversationStage::AwaitingTicket, Some(store)) => store.clone(),
            _ => return Ok(TicketReply::NotExpected),
        };

        let Some(ticket) = parse_ticket_input(text) else {
            return Ok(TicketReply::Invalid);
        };

        self.registry
            .start(chat_id, store.id, ticket, session.language_or_default())
            .await?;
        self.update_session(chat_id, UserSession::end).await;

        Ok(TicketReply::Started(ticket))
    }

    /// Stops monitoring and ends the dialogue. Returns false if nothing was
    /// being monitored.
    pub async fn cancel(&self, chat_id: i64) -> bool {
        self.update_session(chat_id, UserSession::end).await;
        self.registry.cancel(chat_id).await
    }

    /// Progress of the chat's monitor, from a fresh queue read.
    pub async fn status(&self, chat_id: i64) -> StatusReport {
        let Some(MonitorState {
            store_id,
            ticket_number,
            ..
        }) = self.registry.lookup(chat_id).await
        else {
            return StatusReport::NoMonitor;
        };

        let snapshot = match self.feed.fetch(&store_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(chat_id = %chat_id, store_id = %store_id, error = %e, "status fetch failed");
                return StatusReport::Unavailable;
            }
        };

        if snapshot.is_closed() {
            return StatusReport::StoreClosed;
        }

        let thresholds = &self.registry.config().thresholds;
        match snapshot.tables_remaining(ticket_number) {
            Some(tables_remaining) => StatusReport::Progress {
                snapshot,
                tables_remaining,
                final_call: thresholds.is_terminal(thresholds.classify(tables_remaining)),
            },
            None => StatusReport::Unavailable,
        }
    }
}
