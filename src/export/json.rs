//! JSON Export functionality
//!
//! Exports the catalog and the full journal to JSON with schema versioning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, JournalEntry, ServiceCatalogEntry};
use crate::storage::Storage;

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Full ledger export structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    /// Export timestamp
    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    pub categories: Vec<Category>,
    pub services: Vec<ServiceCatalogEntry>,

    /// Journal entries, oldest first
    pub journal: Vec<JournalEntry>,

    pub metadata: ExportMetadata,
}

/// Export metadata for reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub service_count: usize,
    pub category_count: usize,
    pub journal_entry_count: usize,

    /// Applied entries still in effect
    pub active_change_count: usize,

    pub earliest_entry: Option<DateTime<Utc>>,
    pub latest_entry: Option<DateTime<Utc>>,
}

impl LedgerExport {
    /// Create a new export from storage
    pub fn from_storage(storage: &Storage) -> LedgerResult<Self> {
        let catalog = storage.catalog.data()?;
        let mut journal = storage.journal.list_newest_first()?;
        journal.reverse();

        let metadata = ExportMetadata {
            service_count: catalog.services.len(),
            category_count: catalog.categories.len(),
            journal_entry_count: journal.len(),
            active_change_count: journal
                .iter()
                .filter(|e| !e.is_revert() && !e.is_reverted)
                .count(),
            earliest_entry: journal.first().map(|e| e.created_at),
            latest_entry: journal.last().map(|e| e.created_at),
        };

        Ok(Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            categories: catalog.categories,
            services: catalog.services,
            journal,
            metadata,
        })
    }

    /// Check that the export is internally consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Unsupported schema version {} (expected {})",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }
        for entry in &self.journal {
            entry
                .validate()
                .map_err(|e| format!("Journal entry {}: {}", entry.id, e))?;
        }
        if self.metadata.journal_entry_count != self.journal.len() {
            return Err("Journal entry count does not match metadata".into());
        }
        Ok(())
    }
}

/// Export the ledger to JSON
pub fn export_full_json<W: Write>(storage: &Storage, writer: &mut W, pretty: bool) -> LedgerResult<()> {
    let export = LedgerExport::from_storage(storage)?;

    if pretty {
        serde_json::to_writer_pretty(writer, &export)
    } else {
        serde_json::to_writer(writer, &export)
    }
    .map_err(|e| LedgerError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, ChangeKind, ChangeSpecification, Price};
    use crate::services::test_support::{add_service, create_test_storage};
    use crate::services::{BulkUpdateService, RevertService};

    #[test]
    fn test_json_export() {
        let (_temp, storage) = create_test_storage();
        add_service(&storage, "Cut", "30", None);
        let spec = ChangeSpecification::new(ChangeKind::Increase, Amount::parse("10").unwrap(), true);
        let e1 = BulkUpdateService::new(&storage).apply(&spec).unwrap();
        RevertService::new(&storage).revert(e1.id).unwrap();
        BulkUpdateService::new(&storage).apply(&spec).unwrap();

        let mut buffer = Vec::new();
        export_full_json(&storage, &mut buffer, true).unwrap();

        let parsed: LedgerExport = serde_json::from_slice(&buffer).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.journal.len(), 3);
        assert_eq!(parsed.journal[0].id, e1.id);
        assert_eq!(parsed.metadata.active_change_count, 1);
        assert_eq!(parsed.services[0].price, Price::parse("33").unwrap());
    }
}
