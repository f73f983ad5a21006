//! User-facing texts in every supported language.
//!
//! Texts containing `<b>` are meant for Telegram's HTML parse mode. Values
//! interpolated into them are escaped with [`html_escape`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    En,
    /// Traditional Chinese (Cantonese).
    #[default]
    Zh,
}

impl Language {
    /// Every language, in keyboard order.
    pub const ALL: [Language; 2] = [Language::En, Language::Zh];

    /// Short code used in callback data.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Text table for this language.
    pub fn messages(self) -> &'static Messages {
        match self {
            Language::En => &ENGLISH,
            Language::Zh => &CHINESE,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            other => Err(CoreError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// Text table for one language.
#[derive(Debug)]
pub struct Messages {
    pub language_text: &'static str,
    pub welcome: &'static str,
    pub choose_language: &'static str,
    pub choose_store: &'static str,
    store_chosen: &'static str,
    pub ask_ticket_number: &'static str,
    current_queue_is: &'static str,
    store_closed: &'static str,
    pub store_closed_no_more_updates: &'static str,
    entered_queue_please_wait: &'static str,
    pub bad_ticket_input: &'static str,
    pub almost_ready: &'static str,
    still_n_tables: &'static str,
    pub goodbye: &'static str,
    pub stores_unavailable: &'static str,
    pub queue_unavailable: &'static str,
    pub help: &'static str,
}

impl Messages {
    /// "You have chosen <store>."
    pub fn store_chosen(&self, store_name: &str) -> String {
        fill(self.store_chosen, &html_escape(store_name))
    }

    /// "Currently on queue #<tickets>."
    pub fn current_queue_is(&self, queue: &str) -> String {
        fill(self.current_queue_is, &html_escape(queue))
    }

    /// "<store> is currently closed."
    pub fn store_closed(&self, store_name: &str) -> String {
        fill(self.store_closed, &html_escape(store_name))
    }

    /// Confirmation after a ticket number is accepted.
    pub fn entered_queue_please_wait(&self, ticket: u32) -> String {
        fill(self.entered_queue_please_wait, &ticket.to_string())
    }

    /// "Still <n> tables to go!"
    pub fn still_n_tables(&self, tables_remaining: i64) -> String {
        fill(self.still_n_tables, &tables_remaining.to_string())
    }

    /// Store name plus the tickets being served.
    pub fn store_info(&self, store_name: &str, queue: &str) -> String {
        format!("{}\n{}", self.store_chosen(store_name), self.current_queue_is(queue))
    }

    /// Intermediate alert.
    pub fn still_n_tables_queue_now(&self, queue: &str, tables_remaining: i64) -> String {
        format!(
            "{}\n{}",
            self.still_n_tables(tables_remaining),
            self.current_queue_is(queue)
        )
    }

    /// Final-call alert.
    pub fn final_call_queue_now(&self, queue: &str) -> String {
        format!("{}\n{}", self.almost_ready, self.current_queue_is(queue))
    }
}

/// About text, same for every language.
pub const ABOUT: &str = "<b>tablecall</b>\n\
    Tells you when your restaurant queue ticket is about to be called.\n\
    Queue data comes from the store's public queue feed.";

static ENGLISH: Messages = Messages {
    language_text: "English",
    welcome: "Hello! I am the table call bot.",
    choose_language: "Please choose a language",
    choose_store: "Please choose a store",
    store_chosen: "You have chosen <b>{}</b>.",
    ask_ticket_number: "What is your ticket number?",
    current_queue_is: "Currently on queue #{}.",
    store_closed: "Sorry, <b>{}</b> is currently closed.",
    store_closed_no_more_updates: "This store has closed. There will be no more updates.",
    entered_queue_please_wait: "We will let you know when your table {} is ready!",
    bad_ticket_input: "Sorry, please enter a valid number",
    almost_ready: "Your table is almost ready!",
    still_n_tables: "Still <b>{}</b> tables to go!",
    goodbye: "Bye! Send /start whenever you need me again.",
    stores_unavailable: "Sorry, the store list is unavailable right now. Please try again later.",
    queue_unavailable: "Sorry, the queue for this store cannot be read right now. Please try again later.",
    help: "/start - Start talking to me\n\
           /status - Show your queue progress\n\
           /cancel - Stop talking to me\n\
           /help - Display this help message",
};

static CHINESE: Messages = Messages {
    language_text: "中文",
    welcome: "你好! 我是叫號提示 Bot.",
    choose_language: "請選擇語言",
    choose_store: "請選擇店舖",
    store_chosen: "你已選擇 <b>{}</b>",
    ask_ticket_number: "請輸入你的籌號, 我會幫你記下",
    current_queue_is: "現在籌號為 <b>{}</b>",
    store_closed: "<b>{}</b> 現時暫停營業",
    store_closed_no_more_updates: "店舖已暫停營業, 不會再有更新",
    entered_queue_please_wait: "籌號即將到{}號時會通知你!",
    bad_ticket_input: "唔好意思, 請輸入阿拉伯數字",
    almost_ready: "就黎得喇!",
    still_n_tables: "仲有 <b>{}</b> 張籌! ",
    goodbye: "拜拜! 有需要再輸入 /start",
    stores_unavailable: "唔好意思, 暫時未能取得店舖資料, 請稍後再試",
    queue_unavailable: "唔好意思, 暫時未能讀取籌號, 請稍後再試",
    help: "/start - 開始對話\n\
           /status - 顯示籌號進度\n\
           /cancel - 終止對話\n\
           /help - 顯示這訊息",
};

/// Joins one text from every language, one per line.
pub fn all_languages(pick: impl Fn(&Messages) -> &str) -> String {
    Language::ALL
        .iter()
        .map(|lang| pick(lang.messages()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape HTML special characters for Telegram HTML mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn fill(template: &str, value: &str) -> String {
    template.replacen("{}", value, 1)
}
