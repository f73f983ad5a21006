//! Monitor lifecycle events.

use tablecall_core::{AlertStage, StoreId};

use crate::monitor::CompletionReason;

/// Events broadcast by the registry and its monitors.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A monitor was scheduled.
    Started {
        chat_id: i64,
        generation: u64,
        store_id: StoreId,
        ticket_number: u32,
    },
    /// A stage notice was sent (or attempted).
    StageNotified {
        chat_id: i64,
        generation: u64,
        stage: AlertStage,
        tables_remaining: i64,
    },
    /// A monitor finished on its own.
    Completed {
        chat_id: i64,
        generation: u64,
        reason: CompletionReason,
    },
    /// A monitor was cancelled or replaced.
    Cancelled { chat_id: i64, generation: u64 },
}

impl MonitorEvent {
    /// Returns the chat this event belongs to.
    pub fn chat_id(&self) -> i64 {
        match self {
            MonitorEvent::Started { chat_id, .. }
            | MonitorEvent::StageNotified { chat_id, .. }
            | MonitorEvent::Completed { chat_id, .. }
            | MonitorEvent::Cancelled { chat_id, .. } => *chat_id,
        }
    }

    /// Returns the generation of the monitor that produced the event.
    pub fn generation(&self) -> u64 {
        match self {
            MonitorEvent::Started { generation, .. }
            | MonitorEvent::StageNotified { generation, .. }
            | MonitorEvent::Completed { generation, .. }
            | MonitorEvent::Cancelled { generation, .. } => *generation,
        }
    }

    /// Returns true if the monitor is gone after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MonitorEvent::Completed { .. } | MonitorEvent::Cancelled { .. }
        )
    }
}
