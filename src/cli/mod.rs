//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod catalog;
pub mod change;
pub mod export;
pub mod journal;

pub use catalog::{handle_catalog_command, CatalogCommands};
pub use change::{handle_apply_command, handle_preview_command, ChangeArgs};
pub use export::{handle_export_command, ExportFormat};
pub use journal::{handle_journal_command, handle_revert_command, JournalCommands};
