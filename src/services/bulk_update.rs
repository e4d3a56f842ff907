//! Bulk update service
//!
//! Applies a change specification to every selected catalog entry and
//! records the change in the journal, all inside one store transaction.

use std::collections::BTreeMap;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{ChangeSpecification, JournalEntry, NewJournalEntry, RecordKind};
use crate::storage::Storage;

use super::plan_changes;

/// Service for applying bulk price changes
pub struct BulkUpdateService<'a> {
    storage: &'a Storage,
}

impl<'a> BulkUpdateService<'a> {
    /// Create a new bulk update service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Apply `spec` to the catalog and return the new journal entry
    ///
    /// The selection is resolved again inside the transaction rather than
    /// taken from an earlier preview.
    pub fn apply(&self, spec: &ChangeSpecification) -> LedgerResult<JournalEntry> {
        let mut tx = self.storage.begin()?;

        let planned = plan_changes(tx.list_entries(&spec.filter())?, spec)?;

        let category_name = match spec.category_id {
            Some(id) => tx.category_name(id)?,
            None => None,
        };

        if planned.is_empty() {
            let scope = match (&category_name, spec.category_id) {
                (Some(name), _) => format!("category '{}'", name),
                (None, Some(id)) => format!("category {}", id),
                (None, None) => "all categories".to_string(),
            };
            return Err(LedgerError::NoMatchingServices { scope });
        }

        let old_prices: BTreeMap<_, _> = planned
            .iter()
            .map(|change| (change.service_id, change.old_price))
            .collect();

        for change in &planned {
            tx.set_price(change.service_id, change.new_price)?;
        }

        let entry = tx.append_journal(NewJournalEntry {
            record_kind: RecordKind::Applied,
            kind: spec.kind,
            amount: spec.amount,
            is_percentage: spec.is_percentage,
            category_id: spec.category_id,
            category_name,
            old_prices,
            reverts: None,
        })?;

        tx.commit()?;

        tracing::info!(
            entry = %entry.id,
            change = %entry.describe_change(),
            scope = %entry.scope(),
            affected = entry.affected_count,
            "bulk price change applied"
        );
        Ok(entry)
    }
}
