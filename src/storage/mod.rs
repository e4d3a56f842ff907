//! Storage layer for the price ledger
//!
//! Provides JSON file storage with atomic writes, the hash-chained journal,
//! and the transaction boundary every price mutation goes through.
//!
//! Writers are serialized across processes by an advisory lock on
//! `data/ledger.lock`. Whoever holds it re-reads both files first, so no
//! writer ever acts on state another process has since replaced.

pub mod catalog;
pub mod file_io;
pub mod journal;
pub mod transaction;

pub use catalog::{CatalogData, CatalogRepository};
pub use file_io::{read_json, write_json_atomic};
pub use journal::{JournalRecord, JournalRepository};
pub use transaction::LedgerTransaction;

use std::fs::{File, OpenOptions};
use std::sync::{Mutex, MutexGuard};

use fs2::FileExt;

use crate::config::paths::LedgerPaths;
use crate::error::LedgerError;

/// Exclusive hold on the ledger for one writer
///
/// Combines the in-process mutex with the advisory file lock; both are
/// released when the guard is dropped.
pub struct MutationGuard<'a> {
    _local: MutexGuard<'a, ()>,
    file: File,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, "failed to release ledger lock");
        }
    }
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: LedgerPaths,
    pub catalog: CatalogRepository,
    pub journal: JournalRepository,
    mutation_lock: Mutex<()>,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: LedgerPaths) -> Result<Self, LedgerError> {
        paths.ensure_directories()?;

        Ok(Self {
            catalog: CatalogRepository::new(paths.catalog_file()),
            journal: JournalRepository::new(paths.journal_file()),
            paths,
            mutation_lock: Mutex::new(()),
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&mut self) -> Result<(), LedgerError> {
        let _guard = self.acquire()?;
        self.reload()
    }

    fn acquire(&self) -> Result<MutationGuard<'_>, LedgerError> {
        let local = self
            .mutation_lock
            .lock()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire mutation lock: {}", e)))?;

        let lock_path = self.paths.lock_file();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| {
                LedgerError::Storage(format!("Failed to open {}: {}", lock_path.display(), e))
            })?;
        FileExt::lock_exclusive(&file)
            .map_err(|e| LedgerError::Storage(format!("Failed to lock ledger: {}", e)))?;

        Ok(MutationGuard {
            _local: local,
            file,
        })
    }

    /// Re-read both files and bring the catalog up to the journal head
    ///
    /// Must run under the mutation guard. A catalog that is missing commits
    /// (the process stopped between the journal append and the catalog
    /// rename) gets their prices replayed and is written back.
    fn reload(&self) -> Result<(), LedgerError> {
        self.journal.load()?;
        self.catalog.load()?;

        let pending = self
            .journal
            .price_writes_since(self.catalog.journal_head()?.as_deref())?;
        if pending.is_empty() {
            return Ok(());
        }

        let data = self.catalog.with_redo(&pending)?;
        self.catalog.write_file(&data)?;
        self.catalog.install(data)?;
        tracing::warn!(
            commits = pending.len(),
            "catalog was behind the journal; replayed committed prices"
        );
        Ok(())
    }

    /// Acquire the storage-wide mutation lock and refresh from disk
    ///
    /// Held by every transaction and by catalog maintenance, so no two
    /// writers ever interleave, in this process or any other.
    pub fn lock_mutations(&self) -> Result<MutationGuard<'_>, LedgerError> {
        let guard = self.acquire()?;
        self.reload()?;
        Ok(guard)
    }

    /// Begin a serializable transaction over the catalog and journal
    ///
    /// Failing to read the store surfaces as `TransactionAborted`, since
    /// nothing has been staged yet; a broken hash chain stays an integrity
    /// error.
    pub fn begin(&self) -> Result<LedgerTransaction<'_>, LedgerError> {
        let guard = self.lock_mutations().map_err(|e| match e {
            LedgerError::Integrity(_) => e,
            other => transaction::abort(other),
        })?;
        LedgerTransaction::begin(self, guard)
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }
}
