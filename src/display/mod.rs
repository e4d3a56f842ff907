//! Display formatting for terminal output
//!
//! Provides utilities for formatting catalog, preview, and journal data
//! as plain-text tables and detail views.

pub mod catalog;
pub mod journal;
pub mod preview;

pub use catalog::format_catalog_list;
pub use journal::{format_journal_details, format_journal_list};
pub use preview::{format_change_rows, format_preview};
