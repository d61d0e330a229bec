//! Per-user journal entries and categories.

mod journal_manager;

pub use journal_manager::{JournalError, JournalManager, MAX_CONTENT_LENGTH, MAX_TITLE_LENGTH};
