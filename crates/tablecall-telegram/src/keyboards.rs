//! Inline keyboards and their callback data.
//!
//! Callback data is `language:<code>` or `store:<id>`.

use tablecall_core::{Language, StoreId, StoreInfo};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Store buttons per keyboard row.
pub const STORE_COLUMNS: usize = 3;

const LANGUAGE_PREFIX: &str = "language:";
const STORE_PREFIX: &str = "store:";

/// What an inline button press asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Language(Language),
    Store(StoreId),
}

impl CallbackAction {
    /// Parses callback data. Unknown prefixes and languages give `None`.
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(code) = data.strip_prefix(LANGUAGE_PREFIX) {
            return code.parse().ok().map(CallbackAction::Language);
        }
        data.strip_prefix(STORE_PREFIX)
            .filter(|id| !id.is_empty())
            .map(|id| CallbackAction::Store(StoreId::from(id)))
    }

    /// Callback data for this action.
    pub fn data(&self) -> String {
        match self {
            CallbackAction::Language(lang) => format!("{LANGUAGE_PREFIX}{}", lang.code()),
            CallbackAction::Store(id) => format!("{STORE_PREFIX}{id}"),
        }
    }
}

/// One button per language, on one row.
pub fn language_keyboard() -> InlineKeyboardMarkup {
    let row = Language::ALL
        .iter()
        .map(|lang| {
            InlineKeyboardButton::callback(
                lang.messages().language_text,
                CallbackAction::Language(*lang).data(),
            )
        })
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(vec![row])
}

/// One button per store, [`STORE_COLUMNS`] to a row, in the given order.
pub fn store_keyboard(stores: &[StoreInfo]) -> InlineKeyboardMarkup {
    let rows = stores
        .chunks(STORE_COLUMNS)
        .map(|chunk| {
            chunk
                .iter()
                .map(|store| {
                    InlineKeyboardButton::callback(
                        store.name.clone(),
                        CallbackAction::Store(store.store_id()).data(),
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(rows)
}
