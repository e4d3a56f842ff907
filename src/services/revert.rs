//! Revert service
//!
//! Undoes a previously applied bulk change by restoring the prices captured
//! in its journal snapshot. Reverts are strictly LIFO: an entry can only be
//! undone once every newer applied change still in effect has been undone.

use std::collections::BTreeMap;

use crate::error::{LedgerError, LedgerResult};
use crate::models::journal::blocking_entries;
use crate::models::{JournalEntry, JournalEntryId, NewJournalEntry, RecordKind};
use crate::storage::Storage;

/// Service for reverting journal entries
pub struct RevertService<'a> {
    storage: &'a Storage,
}

impl<'a> RevertService<'a> {
    /// Create a new revert service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Revert the entry with the given id and return the new `Revert` entry
    ///
    /// Preconditions are checked in this order: the entry exists, it is not
    /// itself a revert, it has not already been reverted, and nothing newer
    /// blocks it. Services in the snapshot are restored to their recorded
    /// price even if they were changed outside the ledger since.
    pub fn revert(&self, id: JournalEntryId) -> LedgerResult<JournalEntry> {
        let mut tx = self.storage.begin()?;

        let entries = tx.journal_entries()?;
        let target = entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| LedgerError::journal_entry_not_found(id.to_string()))?;

        if target.is_revert() {
            return Err(LedgerError::RevertOfRevertNotAllowed(id));
        }

        if let (true, Some(reverted_at)) = (target.is_reverted, target.reverted_at) {
            return Err(LedgerError::AlreadyReverted { id, reverted_at });
        }

        let blocking = blocking_entries(&entries, target);
        if !blocking.is_empty() {
            tracing::debug!(entry = %id, blockers = blocking.len(), "revert blocked");
            return Err(LedgerError::OutOfOrderRevert { id, blocking });
        }

        let mut overwritten = BTreeMap::new();
        for (service_id, old_price) in &target.old_prices {
            let current = tx
                .get_entry(*service_id)?
                .ok_or_else(|| LedgerError::service_not_found(service_id.to_string()))?;
            overwritten.insert(*service_id, current.price);
            tx.set_price(*service_id, *old_price)?;
        }

        let counter = tx.append_journal(NewJournalEntry {
            record_kind: RecordKind::Revert,
            kind: target.kind,
            amount: target.amount,
            is_percentage: target.is_percentage,
            category_id: target.category_id,
            category_name: target.category_name.clone(),
            old_prices: overwritten,
            reverts: Some(id),
        })?;
        tx.mark_reverted(id, counter.created_at)?;

        tx.commit()?;

        tracing::info!(
            entry = %id,
            revert = %counter.id,
            restored = counter.affected_count,
            "journal entry reverted"
        );
        Ok(counter)
    }
}
