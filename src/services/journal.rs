//! Journal service
//!
//! Read-side access to the price journal: listing, lookup by full or short
//! ID, revert eligibility, and hash chain verification.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::journal::blocking_entries;
use crate::models::{JournalEntry, JournalEntryId};
use crate::storage::Storage;

/// Whether a journal entry can be reverted right now, and if not, why
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertEligibility {
    Eligible,
    IsRevert,
    AlreadyReverted(DateTime<Utc>),
    Blocked(Vec<JournalEntryId>),
}

impl RevertEligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Service for reading the journal
pub struct JournalService<'a> {
    storage: &'a Storage,
}

impl<'a> JournalService<'a> {
    /// Create a new journal service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// List entries newest first, optionally truncated to `limit`
    pub fn list(&self, limit: Option<usize>) -> LedgerResult<Vec<JournalEntry>> {
        let mut entries = self.storage.journal.list_newest_first()?;
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    /// Get an entry by ID
    pub fn get(&self, id: JournalEntryId) -> LedgerResult<Option<JournalEntry>> {
        self.storage.journal.get(id)
    }

    /// Find an entry by full ID or short ID (e.g. `jrn-1a2b3c4d`)
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<JournalEntry>> {
        if let Ok(id) = identifier.parse::<JournalEntryId>() {
            return self.storage.journal.get(id);
        }

        let mut matches: Vec<JournalEntry> = self
            .storage
            .journal
            .entries()?
            .into_iter()
            .filter(|e| e.id.matches_short(identifier))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(LedgerError::Validation(format!(
                "'{}' matches {} journal entries; use a longer ID",
                identifier, n
            ))),
        }
    }

    /// Resolve an identifier to an entry ID or fail with `NotFound`
    pub fn resolve(&self, identifier: &str) -> LedgerResult<JournalEntryId> {
        self.find(identifier)?
            .map(|e| e.id)
            .ok_or_else(|| LedgerError::journal_entry_not_found(identifier))
    }

    /// Whether `entry` could be reverted against the current journal
    pub fn eligibility(&self, entry: &JournalEntry) -> LedgerResult<RevertEligibility> {
        if entry.is_revert() {
            return Ok(RevertEligibility::IsRevert);
        }
        if let Some(at) = entry.reverted_at {
            return Ok(RevertEligibility::AlreadyReverted(at));
        }

        let entries = self.storage.journal.entries()?;
        let blocking = blocking_entries(&entries, entry);
        if blocking.is_empty() {
            Ok(RevertEligibility::Eligible)
        } else {
            Ok(RevertEligibility::Blocked(blocking))
        }
    }

    /// Re-read the journal file and check its hash chain
    ///
    /// Returns the number of records verified.
    pub fn verify(&self) -> LedgerResult<usize> {
        self.storage.journal.verify()
    }

    /// Number of entries in the journal
    pub fn count(&self) -> LedgerResult<usize> {
        self.storage.journal.entry_count()
    }
}
