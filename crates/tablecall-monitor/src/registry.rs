//! Process-wide table of active monitors, one per chat.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tablecall_core::{Language, QueueFeed, StoreId, TicketNumber};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tracing::{debug, error, info};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::event::MonitorEvent;
use crate::monitor::{Monitor, MonitorPhase, MonitorState};
use crate::sink::NotificationSink;

/// Handle to a scheduled monitor.
///
/// Cloning is cheap; every clone controls the same monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    chat_id: i64,
    generation: u64,
    state: Arc<Mutex<MonitorState>>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("chat_id", &self.chat_id)
            .field("generation", &self.generation)
            .finish()
    }
}

impl MonitorHandle {
    /// Chat this monitor belongs to.
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Registry-unique sequence number of this monitor.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Copy of the current state.
    pub async fn state(&self) -> MonitorState {
        self.state.lock().await.clone()
    }

    /// Marks the monitor cancelled and wakes its timer.
    ///
    /// Waits for an in-flight notice to finish. Returns false if the monitor
    /// was already cancelled or completed.
    pub async fn cancel(&self) -> bool {
        let changed = {
            let mut state = self.state.lock().await;
            if state.is_active() {
                state.phase = MonitorPhase::Cancelled;
                true
            } else {
                false
            }
        };
        let _ = self.cancel_tx.send(true);
        changed
    }
}

struct RegistryInner {
    feed: Arc<dyn QueueFeed>,
    sink: Arc<dyn NotificationSink>,
    config: MonitorConfig,
    monitors: RwLock<HashMap<i64, MonitorHandle>>,
    next_generation: AtomicU64,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl RegistryInner {
    fn emit_event(&self, event: MonitorEvent) {
        // Ignore send errors (no receivers)
        let _ = self.event_tx.send(event);
    }

    /// Removes the entry for `chat_id` only if it is still `generation`.
    async fn remove_if_current(&self, chat_id: i64, generation: u64) -> bool {
        let mut monitors = self.monitors.write().await;
        match monitors.get(&chat_id) {
            Some(h) if h.generation == generation => {
                monitors.remove(&chat_id);
                true
            }
            _ => false,
        }
    }
}

/// Owns every active monitor.
///
/// The map lock is only held for inserts, removals and lookups, never across
/// a fetch or a send, so chats do not contend with each other.
#[derive(Clone)]
pub struct MonitorRegistry {
    inner: Arc<RegistryInner>,
}

impl MonitorRegistry {
    /// Creates an empty registry.
    pub fn new(
        feed: Arc<dyn QueueFeed>,
        sink: Arc<dyn NotificationSink>,
        config: MonitorConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        Self {
            inner: Arc::new(RegistryInner {
                feed,
                sink,
                config,
                monitors: RwLock::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                event_tx,
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Subscribe to monitor lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Start monitoring `ticket_number` at `store_id` for `chat_id`.
    ///
    /// Any monitor already registered for the chat is cancelled first. When
    /// this returns, the replaced monitor will not send anything more.
    pub async fn start(
        &self,
        chat_id: i64,
        store_id: StoreId,
        ticket_number: TicketNumber,
        language: Language,
    ) -> Result<MonitorHandle> {
        if ticket_number == 0 {
            return Err(MonitorError::InvalidTicket(ticket_number));
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let state = MonitorState::new(chat_id, store_id.clone(), ticket_number, language);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = MonitorHandle {
            chat_id,
            generation,
            state: Arc::new(Mutex::new(state)),
            cancel_tx: Arc::new(cancel_tx),
        };

        let previous = {
            let mut monitors = self.inner.monitors.write().await;
            monitors.insert(chat_id, handle.clone())
        };

        if let Some(previous) = previous {
            if previous.cancel().await {
                debug!(
                    chat_id = %chat_id,
                    generation = previous.generation,
                    "replaced existing monitor"
                );
                self.inner.emit_event(MonitorEvent::Cancelled {
                    chat_id,
                    generation: previous.generation,
                });
            }
        }

        // Spawned only after the previous monitor is cancelled, so the two
        // never tick side by side.
        let monitor = Monitor::new(
            Arc::clone(&handle.state),
            generation,
            Arc::clone(&self.inner.feed),
            Arc::clone(&self.inner.sink),
            self.inner.config.clone(),
            self.inner.event_tx.clone(),
        );
        let inner = Arc::clone(&self.inner);
        let state = Arc::clone(&handle.state);
        tokio::spawn(async move {
            // Run on its own task so a panic still reaches the cleanup below.
            let phase = match tokio::spawn(monitor.run(cancel_rx)).await {
                Ok(phase) => phase,
                Err(e) => {
                    error!(chat_id = %chat_id, generation, error = %e, "monitor task failed");
                    let mut state = state.lock().await;
                    if state.is_active() {
                        state.phase = MonitorPhase::Cancelled;
                    }
                    state.phase
                }
            };
            if inner.remove_if_current(chat_id, generation).await {
                debug!(chat_id = %chat_id, generation, phase = ?phase, "monitor unregistered");
            }
        });

        info!(
            chat_id = %chat_id,
            store_id = %store_id,
            ticket = ticket_number,
            generation,
            "monitor started"
        );
        self.inner.emit_event(MonitorEvent::Started {
            chat_id,
            generation,
            store_id,
            ticket_number,
        });

        Ok(handle)
    }

    /// Cancel the monitor for `chat_id`. Returns false if there was none.
    pub async fn cancel(&self, chat_id: i64) -> bool {
        let removed = {
            let mut monitors = self.inner.monitors.write().await;
            monitors.remove(&chat_id)
        };

        let Some(handle) = removed else {
            return false;
        };

        let changed = handle.cancel().await;
        if changed {
            info!(chat_id = %chat_id, generation = handle.generation, "monitor cancelled");
            self.inner.emit_event(MonitorEvent::Cancelled {
                chat_id,
                generation: handle.generation,
            });
        }
        changed
    }

    /// Progress of the active monitor for `chat_id`, if any.
    pub async fn lookup(&self, chat_id: i64) -> Option<MonitorState> {
        let handle = {
            let monitors = self.inner.monitors.read().await;
            monitors.get(&chat_id).cloned()
        }?;

        let state = handle.state().await;
        state.is_active().then_some(state)
    }

    /// Number of registered monitors.
    pub async fn active_count(&self) -> usize {
        self.inner.monitors.read().await.len()
    }

    /// Cancel every monitor and clear the table.
    pub async fn shutdown(&self) {
        let handles: Vec<MonitorHandle> = {
            let mut monitors = self.inner.monitors.write().await;
            monitors.drain().map(|(_, h)| h).collect()
        };

        info!(count = handles.len(), "shutting down monitors");

        let cancelled = futures::future::join_all(handles.iter().map(|h| h.cancel())).await;
        for (handle, changed) in handles.iter().zip(cancelled) {
            if changed {
                self.inner.emit_event(MonitorEvent::Cancelled {
                    chat_id: handle.chat_id,
                    generation: handle.generation,
                });
            }
        }
    }
}
