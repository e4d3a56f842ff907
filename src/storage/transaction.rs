//! Scoped, serializable store transactions
//!
//! A `LedgerTransaction` holds the storage-wide mutation lock for its whole
//! lifetime, so every read it makes and every write it stages happen without
//! another `apply` or `revert` interleaving, in this process or another one.
//! Writes are staged in memory and only reach disk and the shared
//! repositories on `commit`. Dropping an uncommitted transaction discards
//! everything it staged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::journal::{sort_newest_first, OrderKey};
use crate::models::{
    CategoryId, EntryFilter, JournalEntry, JournalEntryId, NewJournalEntry, Price,
    ServiceCatalogEntry, ServiceId,
};

use super::journal::{replay, JournalRecord};
use super::{MutationGuard, Storage};

/// An open transaction over the catalog and the journal
pub struct LedgerTransaction<'a> {
    storage: &'a Storage,
    _guard: MutationGuard<'a>,
    price_writes: BTreeMap<ServiceId, Price>,
    records: Vec<JournalRecord>,
    last_position: Option<OrderKey>,
    finished: bool,
}

impl<'a> LedgerTransaction<'a> {
    pub(super) fn begin(storage: &'a Storage, guard: MutationGuard<'a>) -> LedgerResult<Self> {
        let last_position = storage.journal.last_position()?;
        Ok(Self {
            storage,
            _guard: guard,
            price_writes: BTreeMap::new(),
            records: Vec::new(),
            last_position,
            finished: false,
        })
    }

    // Catalog view

    /// List catalog entries as this transaction sees them
    pub fn list_entries(&self, filter: &EntryFilter) -> LedgerResult<Vec<ServiceCatalogEntry>> {
        let mut entries = self.storage.catalog.list_entries(filter)?;
        for entry in entries.iter_mut() {
            if let Some(price) = self.price_writes.get(&entry.id) {
                entry.price = *price;
            }
        }
        Ok(entries)
    }

    /// Get a catalog entry as this transaction sees it
    pub fn get_entry(&self, id: ServiceId) -> LedgerResult<Option<ServiceCatalogEntry>> {
        let mut entry = self.storage.catalog.get_entry(id)?;
        if let (Some(entry), Some(price)) = (entry.as_mut(), self.price_writes.get(&id)) {
            entry.price = *price;
        }
        Ok(entry)
    }

    /// Look up a category name in the directory
    pub fn category_name(&self, id: CategoryId) -> LedgerResult<Option<String>> {
        self.storage.catalog.category_name(id)
    }

    /// Stage a new price for an existing catalog entry
    pub fn set_price(&mut self, id: ServiceId, price: Price) -> LedgerResult<()> {
        if self.storage.catalog.get_entry(id)?.is_none() {
            return Err(LedgerError::service_not_found(id.to_string()));
        }
        self.price_writes.insert(id, price);
        Ok(())
    }

    // Journal view

    /// Journal entries as this transaction sees them, newest first
    pub fn journal_entries(&self) -> LedgerResult<Vec<JournalEntry>> {
        let mut entries = self.storage.journal.entries()?;
        for record in &self.records {
            replay(&mut entries, record)?;
        }
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    /// Stage a new journal entry, assigning its place in the total order
    ///
    /// `created_at` never goes backwards even if the wall clock does, and
    /// `sequence` strictly increases, so `(created_at, sequence)` is total.
    pub fn append_journal(&mut self, draft: NewJournalEntry) -> LedgerResult<JournalEntry> {
        let now = Utc::now();
        let (created_at, sequence) = match self.last_position {
            Some((last_at, last_seq)) => (now.max(last_at), last_seq + 1),
            None => (now, 1),
        };

        let entry = draft.into_entry(sequence, created_at);
        let record = JournalRecord::Entry {
            entry: entry.clone(),
        };

        // Validate against the staged view before accepting it
        let mut view = self.storage.journal.entries()?;
        for staged in self.records.iter().chain(std::iter::once(&record)) {
            replay(&mut view, staged)?;
        }

        self.records.push(record);
        self.last_position = Some(entry.order_key());
        Ok(entry)
    }

    /// Stage the reverted flag for an existing entry
    pub fn mark_reverted(&mut self, id: JournalEntryId, at: DateTime<Utc>) -> LedgerResult<()> {
        let record = JournalRecord::Reverted {
            id,
            reverted_at: at,
        };

        let mut view = self.storage.journal.entries()?;
        for staged in self.records.iter().chain(std::iter::once(&record)) {
            replay(&mut view, staged)?;
        }

        self.records.push(record);
        Ok(())
    }

    /// Persist every staged write, or none of them
    ///
    /// The new catalog is written to a temp file first. Appending the
    /// journal commit is the commit point: if it fails the temp file is
    /// discarded and `TransactionAborted` is returned. Once it succeeds the
    /// change is durable, and a catalog rename that fails afterwards is
    /// redone from the journal on the next load.
    pub fn commit(mut self) -> LedgerResult<()> {
        self.finished = true;

        if self.price_writes.is_empty() && self.records.is_empty() {
            return Ok(());
        }

        let catalog = &self.storage.catalog;
        let journal = &self.storage.journal;
        let committed_at = Utc::now();

        let prepared = journal
            .prepare(&self.price_writes, &self.records, committed_at)
            .map_err(abort)?;
        let mut next = catalog.with_prices(&self.price_writes, committed_at)?;
        next.journal_head = Some(prepared.hash().to_string());
        let staged = catalog.stage_file(&next).map_err(abort)?;

        if let Err(e) = journal.append(prepared) {
            staged.discard();
            tracing::warn!(error = %e, "transaction aborted during journal append");
            return Err(abort(e));
        }

        if let Err(e) = staged.promote() {
            tracing::warn!(
                error = %e,
                "catalog file not updated after commit; it will be rebuilt from the journal on next load"
            );
        }

        catalog.install(next).map_err(|e| {
            LedgerError::Storage(format!(
                "Change was committed to the journal but the loaded catalog is stale, reload before continuing: {}",
                e
            ))
        })?;

        tracing::debug!(
            prices = self.price_writes.len(),
            records = self.records.len(),
            "transaction committed"
        );
        Ok(())
    }
}

pub(super) fn abort(err: LedgerError) -> LedgerError {
    match err {
        LedgerError::TransactionAborted(_) => err,
        other => LedgerError::TransactionAborted(other.to_string()),
    }
}

impl Drop for LedgerTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished && (!self.price_writes.is_empty() || !self.records.is_empty()) {
            tracing::debug!(
                prices = self.price_writes.len(),
                records = self.records.len(),
                "transaction rolled back"
            );
        }
    }
}
