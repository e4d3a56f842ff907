//! Core data models for the price ledger
//!
//! This module contains the data structures shared by the storage and
//! service layers: catalog entries, change specifications, prices, and
//! journal entries.

pub mod catalog;
pub mod change;
pub mod ids;
pub mod journal;
pub mod price;

pub use catalog::{Category, EntryFilter, ServiceCatalogEntry};
pub use change::{Amount, ChangeKind, ChangeSpecification};
pub use ids::{CategoryId, JournalEntryId, ServiceId};
pub use journal::{JournalEntry, NewJournalEntry, RecordKind};
pub use price::Price;
