//! Per-chat queue monitor.
//!
//! A [`Monitor`] owns one chat's [`MonitorState`] and checks the store's
//! queue on every tick:
//!
//! 1. fetch a snapshot (failures skip the tick)
//! 2. closed store: send the closed notice and complete
//! 3. classify `ticket - max(active)` into an [`AlertStage`]
//! 4. notify only when the stage rises above `last_stage_notified`
//! 5. complete after the final-call notice
//!
//! The decide-and-send step runs while holding the state lock. Cancelling
//! takes the same lock, so once a cancel has returned the monitor cannot
//! send again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tablecall_core::{
    AlertStage, Language, QueueFeed, StoreId, StoreQueueSnapshot, StoreStatus, TicketNumber,
};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::{MonitorConfig, MIN_POLL_INTERVAL};
use crate::event::MonitorEvent;
use crate::sink::{Notification, NotificationSink};

/// Why a monitor finished on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Final-call notice was sent.
    FinalCall,
    /// Store reported closed (or stayed empty too long).
    StoreClosed,
}

/// Lifecycle phase of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    /// Ticking.
    Active,
    /// Stopped by the user or replaced.
    Cancelled,
    /// Finished on its own.
    Completed(CompletionReason),
}

/// Progress of one chat's queue ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorState {
    pub chat_id: i64,
    pub store_id: StoreId,
    pub ticket_number: TicketNumber,
    pub language: Language,
    /// Highest stage a notice was sent for. Never decreases.
    pub last_stage_notified: AlertStage,
    pub phase: MonitorPhase,
    pub started_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl MonitorState {
    /// Creates an active state with no stage reached.
    pub fn new(
        chat_id: i64,
        store_id: StoreId,
        ticket_number: TicketNumber,
        language: Language,
    ) -> Self {
        Self {
            chat_id,
            store_id,
            ticket_number,
            language,
            last_stage_notified: AlertStage::NONE,
            phase: MonitorPhase::Active,
            started_at: Utc::now(),
            last_checked_at: None,
        }
    }

    /// True while the monitor keeps ticking.
    pub fn is_active(&self) -> bool {
        self.phase == MonitorPhase::Active
    }

    /// True once cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.phase == MonitorPhase::Cancelled
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Feed failed; nothing changed.
    Skipped,
    /// Checked the queue; no new stage.
    Waiting,
    /// Sent a notice for a new intermediate stage.
    Notified(AlertStage),
    /// Monitor is done.
    Completed(CompletionReason),
    /// Monitor was no longer active (cancelled, or completed earlier).
    Stopped,
}

impl TickOutcome {
    /// True if no further ticks should run.
    pub fn is_final(self) -> bool {
        matches!(self, TickOutcome::Completed(_) | TickOutcome::Stopped)
    }
}

enum Step {
    Wait,
    Closed,
    Notify { stage: AlertStage, tables_remaining: i64 },
}

/// The recurring task for one chat.
pub struct Monitor {
    state: Arc<Mutex<MonitorState>>,
    generation: u64,
    feed: Arc<dyn QueueFeed>,
    sink: Arc<dyn NotificationSink>,
    config: MonitorConfig,
    events: broadcast::Sender<MonitorEvent>,
    empty_streak: u32,
}

impl Monitor {
    /// Creates a monitor over a shared state cell.
    pub fn new(
        state: Arc<Mutex<MonitorState>>,
        generation: u64,
        feed: Arc<dyn QueueFeed>,
        sink: Arc<dyn NotificationSink>,
        config: MonitorConfig,
        events: broadcast::Sender<MonitorEvent>,
    ) -> Self {
        Self {
            state,
            generation,
            feed,
            sink,
            config,
            events,
            empty_streak: 0,
        }
    }

    /// Shared state cell.
    pub fn state(&self) -> Arc<Mutex<MonitorState>> {
        Arc::clone(&self.state)
    }

    /// Tick on the configured interval until completed or cancelled.
    ///
    /// The first check happens one interval after start. Ticks never
    /// overlap: a slow fetch delays the next tick instead of stacking.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) -> MonitorPhase {
        let period = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            generation = self.generation,
            poll_interval_secs = period.as_secs(),
            "monitor started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await.is_final() {
                        break;
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        debug!(generation = self.generation, "monitor received cancel signal");
                        break;
                    }
                }
            }
        }

        let phase = self.state.lock().await.phase;
        debug!(generation = self.generation, phase = ?phase, "monitor stopped");
        phase
    }

    /// Run one check.
    pub async fn tick(&mut self) -> TickOutcome {
        let (chat_id, store_id) = {
            let state = self.state.lock().await;
            if !state.is_active() {
                return TickOutcome::Stopped;
            }
            (state.chat_id, state.store_id.clone())
        };

        let snapshot = match self.feed.fetch(&store_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(chat_id = %chat_id, store_id = %store_id, error = %e, "queue fetch failed, skipping tick");
                return TickOutcome::Skipped;
            }
        };

        let cell = Arc::clone(&self.state);
        let mut state = cell.lock().await;
        if !state.is_active() {
            debug!(chat_id = %chat_id, "cancelled during fetch, dropping result");
            return TickOutcome::Stopped;
        }
        state.last_checked_at = Some(Utc::now());

        match self.evaluate(&state, &snapshot) {
            Step::Wait => {
                trace!(chat_id = %chat_id, tickets = ?snapshot.active_tickets, "no new stage");
                TickOutcome::Waiting
            }
            Step::Closed => {
                let text = state.language.messages().store_closed_no_more_updates;
                self.send(Notification::plain(chat_id, text)).await;
                let reason = CompletionReason::StoreClosed;
                state.phase = MonitorPhase::Completed(reason);
                info!(chat_id = %chat_id, store_id = %store_id, "store closed, monitor completed");
                self.emit_completed(chat_id, reason);
                TickOutcome::Completed(reason)
            }
            Step::Notify { stage, tables_remaining } => {
                let messages = state.language.messages();
                let queue = snapshot.queue_text();
                let terminal = self.config.thresholds.is_terminal(stage);
                let text = if terminal {
                    messages.final_call_queue_now(&queue)
                } else {
                    messages.still_n_tables_queue_now(&queue, tables_remaining)
                };

                self.send(Notification::html(chat_id, text)).await;
                // Not rolled back on delivery failure.
                state.last_stage_notified = stage;

                info!(
                    chat_id = %chat_id,
                    stage = %stage,
                    tables_remaining,
                    "stage notice sent"
                );
                let _ = self.events.send(MonitorEvent::StageNotified {
                    chat_id,
                    generation: self.generation,
                    stage,
                    tables_remaining,
                });

                if terminal {
                    let reason = CompletionReason::FinalCall;
                    state.phase = MonitorPhase::Completed(reason);
                    self.emit_completed(chat_id, reason);
                    TickOutcome::Completed(reason)
                } else {
                    TickOutcome::Notified(stage)
                }
            }
        }
    }

    fn evaluate(&mut self, state: &MonitorState, snapshot: &StoreQueueSnapshot) -> Step {
        if snapshot.is_closed() {
            return Step::Closed;
        }

        let Some(tables_remaining) = snapshot.tables_remaining(state.ticket_number) else {
            if snapshot.status == StoreStatus::Unknown {
                self.empty_streak += 1;
                debug!(
                    chat_id = %state.chat_id,
                    streak = self.empty_streak,
                    "empty queue without store status"
                );
                if self.empty_streak >= self.config.closed_after_empty_reads {
                    return Step::Closed;
                }
            }
            return Step::Wait;
        };
        self.empty_streak = 0;

        let stage = self.config.thresholds.classify(tables_remaining);
        if stage <= state.last_stage_notified {
            return Step::Wait;
        }

        Step::Notify {
            stage,
            tables_remaining,
        }
    }

    async fn send(&self, notification: Notification) {
        if let Err(e) = self.sink.deliver(&notification).await {
            warn!(chat_id = %notification.chat_id, error = %e, "failed to deliver notice");
        }
    }

    fn emit_completed(&self, chat_id: i64, reason: CompletionReason) {
        let _ = self.events.send(MonitorEvent::Completed {
            chat_id,
            generation: self.generation,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MonitorError, Result};
    use crate::sink::TextFormat;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tablecall_core::{AlertThresholds, FeedError, FeedResult};

    struct ScriptedFeed {
        script: std::sync::Mutex<VecDeque<FeedResult<StoreQueueSnapshot>>>,
    }

    impl ScriptedFeed {
        fn new(script: Vec<FeedResult<StoreQueueSnapshot>>) -> Arc<Self> {
            Arc::new(Self {
                script: std::sync::Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl QueueFeed for ScriptedFeed {
        async fn fetch(&self, store_id: &StoreId) -> FeedResult<StoreQueueSnapshot> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FeedError::UnknownStore(store_id.to_string())))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: std::sync::Mutex<Vec<Notification>>,
        fail: bool,
    }

    impl RecordingSink {
        fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|n| n.text.clone()).collect()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail {
                return Err(MonitorError::Delivery("blocked by user".into()));
            }
            Ok(())
        }
    }

    fn open(tickets: Vec<u32>) -> FeedResult<StoreQueueSnapshot> {
        Ok(StoreQueueSnapshot::new("9", tickets, StoreStatus::Open))
    }

    fn snapshot(tickets: Vec<u32>, status: StoreStatus) -> FeedResult<StoreQueueSnapshot> {
        Ok(StoreQueueSnapshot::new("9", tickets, status))
    }

    fn monitor(
        ticket: u32,
        feed: Arc<ScriptedFeed>,
        sink: Arc<RecordingSink>,
        config: MonitorConfig,
    ) -> Monitor {
        let state = MonitorState::new(1, StoreId::from("9"), ticket, Language::En);
        let (events, _) = broadcast::channel(16);
        Monitor::new(Arc::new(Mutex::new(state)), 0, feed, sink, config, events)
    }

    #[tokio::test]
    async fn test_reference_scenario() {
        let feed = ScriptedFeed::new(vec![open(vec![39]), open(vec![41]), open(vec![49]), open(vec![50])]);
        let sink = Arc::new(RecordingSink::default());
        let mut m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());

        assert_eq!(m.tick().await, TickOutcome::Waiting);
        assert!(sink.texts().is_empty());

        assert_eq!(m.tick().await, TickOutcome::Notified(AlertStage::new(1)));
        assert!(sink.texts()[0].contains("<b>9</b> tables"));
        assert_eq!(sink.sent.lock().unwrap()[0].format, TextFormat::Html);

        assert_eq!(m.tick().await, TickOutcome::Completed(CompletionReason::FinalCall));
        assert!(sink.texts()[1].starts_with("Your table is almost ready!"));

        // completed monitors do not fetch or send again
        assert_eq!(m.tick().await, TickOutcome::Stopped);
        assert_eq!(sink.texts().len(), 2);

        let state = m.state().lock().await.clone();
        assert_eq!(state.last_stage_notified, AlertStage::new(3));
        assert_eq!(state.phase, MonitorPhase::Completed(CompletionReason::FinalCall));
    }

    #[tokio::test]
    async fn test_stages_never_repeat_or_decrease() {
        // remaining: 9, 8, 4, 12 (regression), 9, 4, 3
        let feed = ScriptedFeed::new(vec![
            open(vec![41]),
            open(vec![42]),
            open(vec![46]),
            open(vec![38]),
            open(vec![41]),
            open(vec![46]),
            open(vec![47]),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let mut m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());

        let mut outcomes = Vec::new();
        for _ in 0..7 {
            outcomes.push(m.tick().await);
        }

        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Notified(AlertStage::new(1)),
                TickOutcome::Waiting,
                TickOutcome::Notified(AlertStage::new(2)),
                TickOutcome::Waiting,
                TickOutcome::Waiting,
                TickOutcome::Waiting,
                TickOutcome::Waiting,
            ]
        );
        assert_eq!(sink.texts().len(), 2);
    }

    #[tokio::test]
    async fn test_jump_straight_to_final_call() {
        let feed = ScriptedFeed::new(vec![open(vec![60])]);
        let sink = Arc::new(RecordingSink::default());
        let mut m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());

        assert_eq!(m.tick().await, TickOutcome::Completed(CompletionReason::FinalCall));
        assert_eq!(sink.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_after_stage() {
        let feed = ScriptedFeed::new(vec![open(vec![41]), snapshot(vec![], StoreStatus::Closed)]);
        let sink = Arc::new(RecordingSink::default());
        let mut m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());

        m.tick().await;
        assert_eq!(m.tick().await, TickOutcome::Completed(CompletionReason::StoreClosed));

        let texts = sink.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1], Language::En.messages().store_closed_no_more_updates);
        assert_eq!(sink.sent.lock().unwrap()[1].format, TextFormat::Plain);
    }

    #[tokio::test]
    async fn test_feed_failure_is_silent() {
        let feed = ScriptedFeed::new(vec![
            Err(FeedError::Unreachable("timeout".into())),
            Err(FeedError::Malformed("garbage".into())),
            open(vec![41]),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let mut m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());

        assert_eq!(m.tick().await, TickOutcome::Skipped);
        assert_eq!(m.tick().await, TickOutcome::Skipped);
        assert!(sink.texts().is_empty());
        assert!(m.state().lock().await.is_active());

        assert_eq!(m.tick().await, TickOutcome::Notified(AlertStage::new(1)));
    }

    #[tokio::test]
    async fn test_empty_open_store_keeps_waiting() {
        let feed = ScriptedFeed::new(vec![
            snapshot(vec![], StoreStatus::Open),
            snapshot(vec![], StoreStatus::Open),
            snapshot(vec![], StoreStatus::Open),
            snapshot(vec![], StoreStatus::Open),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let mut m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());

        for _ in 0..4 {
            assert_eq!(m.tick().await, TickOutcome::Waiting);
        }
        assert!(sink.texts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_unknown_streak_closes() {
        let feed = ScriptedFeed::new(vec![
            snapshot(vec![], StoreStatus::Unknown),
            snapshot(vec![], StoreStatus::Unknown),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let config = MonitorConfig::default().with_closed_after_empty_reads(2);
        let mut m = monitor(50, feed, Arc::clone(&sink), config);

        assert_eq!(m.tick().await, TickOutcome::Waiting);
        assert_eq!(m.tick().await, TickOutcome::Completed(CompletionReason::StoreClosed));
        assert_eq!(sink.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_streak_reset_by_tickets() {
        let feed = ScriptedFeed::new(vec![
            snapshot(vec![], StoreStatus::Unknown),
            open(vec![30]),
            snapshot(vec![], StoreStatus::Unknown),
            snapshot(vec![], StoreStatus::Unknown),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let config = MonitorConfig::default().with_closed_after_empty_reads(2);
        let mut m = monitor(50, feed, Arc::clone(&sink), config);

        assert_eq!(m.tick().await, TickOutcome::Waiting);
        assert_eq!(m.tick().await, TickOutcome::Waiting);
        assert_eq!(m.tick().await, TickOutcome::Waiting);
        assert_eq!(m.tick().await, TickOutcome::Completed(CompletionReason::StoreClosed));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_roll_back() {
        let feed = ScriptedFeed::new(vec![open(vec![41]), open(vec![41])]);
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let mut m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());

        assert_eq!(m.tick().await, TickOutcome::Notified(AlertStage::new(1)));
        assert_eq!(m.tick().await, TickOutcome::Waiting);
        assert_eq!(sink.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_thresholds() {
        let feed = ScriptedFeed::new(vec![open(vec![17]), open(vec![20])]);
        let sink = Arc::new(RecordingSink::default());
        let config = MonitorConfig::default()
            .with_thresholds(AlertThresholds::new(vec![3, 0]).unwrap());
        let mut m = monitor(20, feed, Arc::clone(&sink), config);

        assert_eq!(m.tick().await, TickOutcome::Notified(AlertStage::new(1)));
        assert_eq!(m.tick().await, TickOutcome::Completed(CompletionReason::FinalCall));
    }

    #[tokio::test]
    async fn test_cancelled_state_stops_tick() {
        let feed = ScriptedFeed::new(vec![open(vec![49])]);
        let sink = Arc::new(RecordingSink::default());
        let mut m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());

        m.state().lock().await.phase = MonitorPhase::Cancelled;
        assert_eq!(m.tick().await, TickOutcome::Stopped);
        assert!(sink.texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel_signal() {
        let feed = ScriptedFeed::new(vec![open(vec![30]), open(vec![30]), open(vec![30])]);
        let sink = Arc::new(RecordingSink::default());
        let m = monitor(50, feed, Arc::clone(&sink), MonitorConfig::default());
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(m.run(rx));
        tokio::time::sleep(std::time::Duration::from_secs(45)).await;
        tx.send(true).unwrap();

        let phase = tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("monitor should stop")
            .unwrap();
        assert_eq!(phase, MonitorPhase::Active);
        assert!(sink.texts().is_empty());
    }
}
