//! CSV Export functionality
//!
//! Exports the journal as one row per entry, oldest first.

use std::io::Write;

use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::storage::Storage;

#[derive(Serialize)]
struct JournalRow {
    id: String,
    sequence: u64,
    created_at: String,
    record_kind: String,
    change: String,
    category: String,
    affected_count: usize,
    is_reverted: bool,
    reverted_at: String,
    reverts: String,
}

/// Export all journal entries to CSV
pub fn export_journal_csv<W: Write>(storage: &Storage, writer: W) -> LedgerResult<usize> {
    let mut entries = storage.journal.list_newest_first()?;
    entries.reverse();

    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in &entries {
        let row = JournalRow {
            id: entry.id.as_uuid().to_string(),
            sequence: entry.sequence,
            created_at: entry.created_at.to_rfc3339(),
            record_kind: entry.record_kind.to_string(),
            change: entry.describe_change(),
            category: entry.category_name.clone().unwrap_or_default(),
            affected_count: entry.affected_count,
            is_reverted: entry.is_reverted,
            reverted_at: entry
                .reverted_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            reverts: entry
                .reverts
                .map(|id| id.as_uuid().to_string())
                .unwrap_or_default(),
        };
        csv_writer
            .serialize(row)
            .map_err(|e| LedgerError::Export(e.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|e| LedgerError::Export(e.to_string()))?;

    Ok(entries.len())
}
