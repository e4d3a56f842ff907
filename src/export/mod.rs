//! Export module for the price ledger
//!
//! Provides ledger export in multiple formats:
//! - CSV: the journal, one row per entry (spreadsheet-compatible)
//! - JSON: catalog and journal, machine-readable
//! - YAML: catalog and journal, human-readable

pub mod csv;
pub mod json;
pub mod yaml;

pub use self::csv::export_journal_csv;
pub use json::{export_full_json, LedgerExport, EXPORT_SCHEMA_VERSION};
pub use yaml::export_full_yaml;
