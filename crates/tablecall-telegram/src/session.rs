//! Per-chat conversation state.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tablecall_core::{Language, StoreId, TicketNumber};
use tokio::time::Instant;

/// Where a chat is in the onboarding dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationStage {
    /// No dialogue in progress.
    #[default]
    Idle,
    /// Language keyboard shown.
    ChoosingLanguage,
    /// Store keyboard shown.
    ChoosingStore,
    /// Waiting for the ticket number.
    AwaitingTicket,
}

/// A store picked from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChoice {
    pub id: StoreId,
    pub name: String,
}

/// A chat's dialogue state.
#[derive(Debug, Clone, Default)]
pub struct UserSession {
    /// Chosen language, if any.
    pub language: Option<Language>,
    /// Chosen store, if any.
    pub store: Option<StoreChoice>,
    /// Current dialogue step.
    pub stage: ConversationStage,
    /// Last time the chat changed this session.
    pub last_active: Option<Instant>,
}

impl UserSession {
    /// Chosen language, falling back to the default.
    pub fn language_or_default(&self) -> Language {
        self.language.unwrap_or_default()
    }

    /// Start the dialogue over, keeping the language.
    pub fn restart(&mut self) {
        self.store = None;
        self.stage = ConversationStage::ChoosingLanguage;
    }

    /// End the dialogue, keeping the language.
    pub fn end(&mut self) {
        self.store = None;
        self.stage = ConversationStage::Idle;
    }

    /// Record activity now.
    pub fn touch(&mut self) {
        self.last_active = Some(Instant::now());
    }

    /// Idle and untouched for at least `max_idle`.
    pub fn is_stale(&self, max_idle: Duration) -> bool {
        self.stage == ConversationStage::Idle
            && self.last_active.map_or(true, |t| t.elapsed() >= max_idle)
    }
}

fn ticket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[1-9][0-9]*$").expect("ticket pattern is valid"))
}

/// Parses a ticket number typed by the user: a positive integer without
/// leading zeros or signs.
pub fn parse_ticket_input(text: &str) -> Option<TicketNumber> {
    let text = text.trim();
    if !ticket_pattern().is_match(text) {
        return None;
    }
    text.parse().ok()
}
