//! Hash-chained journal repository
//!
//! The journal file uses a line-delimited JSON format (JSONL). Each line is
//! one committed transaction: its records, the prices it wrote, and the
//! SHA-256 of the previous line's hash and this commit, so any edit, deletion,
//! or reordering of history breaks the chain on load.
//!
//! Appending a line is the commit point of a transaction. The catalog file is
//! written afterwards and remembers the hash of the last commit it reflects;
//! the prices stored here let a catalog that fell behind be brought forward.
//!
//! Records are never rewritten. Flipping an entry's reverted flag is itself a
//! new `Reverted` record that is replayed on load.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LedgerError;
use crate::models::journal::{sort_newest_first, OrderKey};
use crate::models::{JournalEntry, JournalEntryId, Price, ServiceId};

use super::file_io::{append_lines, read_lines, truncate_file};

/// Hash that precedes the first commit
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One replayable change to the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalRecord {
    /// A new entry was appended
    Entry { entry: JournalEntry },
    /// An existing entry was marked as reverted
    Reverted {
        id: JournalEntryId,
        reverted_at: DateTime<Utc>,
    },
}

/// The hashed part of a commit line
#[derive(Serialize)]
struct CommitBody<'a> {
    committed_at: &'a DateTime<Utc>,
    prices: &'a BTreeMap<ServiceId, Price>,
    records: &'a [JournalRecord],
}

/// A commit as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChainedCommit {
    prev_hash: String,
    hash: String,
    committed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    prices: BTreeMap<ServiceId, Price>,
    records: Vec<JournalRecord>,
}

fn chain_hash(prev_hash: &str, body: &CommitBody<'_>) -> Result<String, LedgerError> {
    let payload = serde_json::to_string(body)
        .map_err(|e| LedgerError::Json(format!("Failed to serialize journal commit: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(payload.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Prices written by one committed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PriceRedo {
    pub hash: String,
    pub committed_at: DateTime<Utc>,
    pub prices: BTreeMap<ServiceId, Price>,
}

/// A serialized, validated commit waiting to be appended
#[derive(Debug)]
pub(crate) struct PreparedCommit {
    prev_hash: String,
    line: String,
    entries: Vec<JournalEntry>,
    record_count: usize,
    redo: PriceRedo,
}

impl PreparedCommit {
    /// Hash the journal head will have once this commit is appended
    pub fn hash(&self) -> &str {
        &self.redo.hash
    }
}

/// Apply one record to an in-memory entry list
pub(crate) fn replay(entries: &mut Vec<JournalEntry>, record: &JournalRecord) -> Result<(), LedgerError> {
    match record {
        JournalRecord::Entry { entry } => {
            if entries.iter().any(|e| e.id == entry.id) {
                return Err(LedgerError::Integrity(format!(
                    "duplicate journal entry {}",
                    entry.id
                )));
            }
            if let Some(last) = entries.iter().max_by_key(|e| e.order_key()) {
                if entry.order_key() <= last.order_key() {
                    return Err(LedgerError::Integrity(format!(
                        "journal entry {} is out of order",
                        entry.id
                    )));
                }
            }
            entry
                .validate()
                .map_err(|e| LedgerError::Integrity(format!("journal entry {}: {}", entry.id, e)))?;
            entries.push(entry.clone());
        }
        JournalRecord::Reverted { id, reverted_at } => {
            let entry = entries
                .iter_mut()
                .find(|e| e.id == *id)
                .ok_or_else(|| {
                    LedgerError::Integrity(format!("revert marker for unknown entry {}", id))
                })?;
            if entry.is_revert() || entry.is_reverted {
                return Err(LedgerError::Integrity(format!(
                    "entry {} cannot be marked reverted",
                    id
                )));
            }
            entry.mark_reverted(*reverted_at);
        }
    }
    Ok(())
}

#[derive(Debug)]
struct JournalState {
    entries: Vec<JournalEntry>,
    last_hash: String,
    record_count: usize,
    commits: Vec<PriceRedo>,
}

impl Default for JournalState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            last_hash: GENESIS_HASH.to_string(),
            record_count: 0,
            commits: Vec::new(),
        }
    }
}

/// Repository for the append-only price journal
pub struct JournalRepository {
    path: PathBuf,
    state: RwLock<JournalState>,
}

impl JournalRepository {
    /// Create a new journal repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: RwLock::new(JournalState::default()),
        }
    }

    /// Get the path to the journal file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load and verify the journal from disk
    ///
    /// An unreadable fragment after the last newline is what a write cut
    /// short leaves behind; it never committed and is truncated away.
    pub fn load(&self) -> Result<(), LedgerError> {
        let loaded = self.read_verified(true)?;

        let mut state = self
            .state
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        *state = loaded;

        tracing::debug!(
            commits = state.commits.len(),
            records = state.record_count,
            entries = state.entries.len(),
            "journal loaded"
        );
        Ok(())
    }

    /// Re-read the file and check the hash chain, returning the record count
    pub fn verify(&self) -> Result<usize, LedgerError> {
        Ok(self.read_verified(false)?.record_count)
    }

    fn read_verified(&self, repair: bool) -> Result<JournalState, LedgerError> {
        let contents = read_lines(&self.path)?;
        let mut lines = contents.lines;

        if let Some(tail) = contents.tail {
            let complete = serde_json::from_str::<ChainedCommit>(&tail).is_ok();
            match (complete, repair) {
                (true, true) => {
                    // Terminate the final line so the next append starts fresh
                    append_lines(&self.path, &[String::new()])?;
                    lines.push(tail);
                }
                (true, false) => lines.push(tail),
                (false, true) => {
                    tracing::warn!(
                        bytes = tail.len(),
                        "discarding incomplete commit at end of journal"
                    );
                    truncate_file(&self.path, contents.complete_len)?;
                }
                (false, false) => {
                    return Err(LedgerError::Integrity(
                        "incomplete commit at end of journal".into(),
                    ))
                }
            }
        }

        let mut state = JournalState::default();
        for (line_num, line) in lines.iter().enumerate() {
            let chained: ChainedCommit = serde_json::from_str(line).map_err(|e| {
                LedgerError::Integrity(format!(
                    "unreadable journal commit at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            if chained.prev_hash != state.last_hash {
                tracing::warn!(line = line_num + 1, "journal chain broken");
                return Err(LedgerError::Integrity(format!(
                    "hash chain broken at line {}",
                    line_num + 1
                )));
            }
            let expected = chain_hash(
                &chained.prev_hash,
                &CommitBody {
                    committed_at: &chained.committed_at,
                    prices: &chained.prices,
                    records: &chained.records,
                },
            )?;
            if expected != chained.hash {
                tracing::warn!(line = line_num + 1, "journal commit hash mismatch");
                return Err(LedgerError::Integrity(format!(
                    "commit hash mismatch at line {}",
                    line_num + 1
                )));
            }

            for record in &chained.records {
                replay(&mut state.entries, record)?;
            }
            state.record_count += chained.records.len();
            state.last_hash = chained.hash.clone();
            state.commits.push(PriceRedo {
                hash: chained.hash,
                committed_at: chained.committed_at,
                prices: chained.prices,
            });
        }

        Ok(state)
    }

    /// Validate and serialize a commit against the current head
    ///
    /// Nothing is written; memory and disk are untouched until `append`.
    pub(crate) fn prepare(
        &self,
        prices: &BTreeMap<ServiceId, Price>,
        records: &[JournalRecord],
        committed_at: DateTime<Utc>,
    ) -> Result<PreparedCommit, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut entries = state.entries.clone();
        for record in records {
            replay(&mut entries, record)?;
        }

        let hash = chain_hash(
            &state.last_hash,
            &CommitBody {
                committed_at: &committed_at,
                prices,
                records,
            },
        )?;
        let chained = ChainedCommit {
            prev_hash: state.last_hash.clone(),
            hash: hash.clone(),
            committed_at,
            prices: prices.clone(),
            records: records.to_vec(),
        };
        let line = serde_json::to_string(&chained)
            .map_err(|e| LedgerError::Json(format!("Failed to serialize journal commit: {}", e)))?;

        Ok(PreparedCommit {
            prev_hash: chained.prev_hash,
            line,
            entries,
            record_count: records.len(),
            redo: PriceRedo {
                hash,
                committed_at,
                prices: chained.prices,
            },
        })
    }

    /// Durably append a prepared commit, then apply it in memory
    ///
    /// Memory is only updated once the line is on disk.
    pub(crate) fn append(&self, commit: PreparedCommit) -> Result<(), LedgerError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if state.last_hash != commit.prev_hash {
            return Err(LedgerError::Storage(
                "journal head moved after the commit was prepared".into(),
            ));
        }

        append_lines(&self.path, &[commit.line])?;

        state.entries = commit.entries;
        state.last_hash = commit.redo.hash.clone();
        state.record_count += commit.record_count;
        state.commits.push(commit.redo);
        Ok(())
    }

    /// Hash of the newest commit, or the genesis hash for an empty journal
    pub fn head(&self) -> Result<String, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(state.last_hash.clone())
    }

    /// Price writes committed after `head`, oldest first
    ///
    /// `None` means the reader has seen no commit at all.
    pub(crate) fn price_writes_since(&self, head: Option<&str>) -> Result<Vec<PriceRedo>, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let start = match head {
            None => 0,
            Some(hash) if hash == GENESIS_HASH => 0,
            Some(hash) => state
                .commits
                .iter()
                .position(|c| c.hash == hash)
                .map(|i| i + 1)
                .ok_or_else(|| {
                    LedgerError::Integrity(format!(
                        "catalog refers to journal commit {} which is not in the journal",
                        hash
                    ))
                })?,
        };
        Ok(state.commits[start..].to_vec())
    }

    /// All entries in append order (oldest first)
    pub fn entries(&self) -> Result<Vec<JournalEntry>, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(state.entries.clone())
    }

    /// All entries, newest first
    pub fn list_newest_first(&self) -> Result<Vec<JournalEntry>, LedgerError> {
        let mut entries = self.entries()?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    /// Get an entry by ID
    pub fn get(&self, id: JournalEntryId) -> Result<Option<JournalEntry>, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(state.entries.iter().find(|e| e.id == id).cloned())
    }

    /// Position of the newest entry, if any
    pub fn last_position(&self) -> Result<Option<OrderKey>, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(state.entries.iter().map(|e| e.order_key()).max())
    }

    /// Count entries
    pub fn entry_count(&self) -> Result<usize, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(state.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, ChangeKind, NewJournalEntry, Price, RecordKind, ServiceId};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_repo() -> (JournalRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = JournalRepository::new(temp_dir.path().join("journal.jsonl"));
        (repo, temp_dir)
    }

    fn entry(sequence: u64) -> JournalEntry {
        let mut old_prices = BTreeMap::new();
        old_prices.insert(ServiceId::new(), Price::from_cents(10000));
        NewJournalEntry {
            record_kind: RecordKind::Applied,
            kind: ChangeKind::Increase,
            amount: Amount::parse("10").unwrap(),
            is_percentage: true,
            category_id: None,
            category_name: None,
            old_prices,
            reverts: None,
        }
        .into_entry(sequence, Utc::now())
    }

    fn commit(repo: &JournalRepository, records: &[JournalRecord]) -> Result<(), LedgerError> {
        let prepared = repo.prepare(&BTreeMap::new(), records, Utc::now())?;
        repo.append(prepared)
    }

    #[test]
    fn test_append_and_reload() {
        let (repo, temp) = create_test_repo();
        let first = entry(1);
        commit(&repo, &[JournalRecord::Entry {
            entry: first.clone(),
        }])
        .unwrap();

        let reloaded = JournalRepository::new(temp.path().join("journal.jsonl"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.entries().unwrap(), vec![first]);
        assert_eq!(reloaded.verify().unwrap(), 1);
    }

    #[test]
    fn test_reverted_marker_replays() {
        let (repo, temp) = create_test_repo();
        let first = entry(1);
        let at = Utc::now();
        commit(&repo, &[
            JournalRecord::Entry {
                entry: first.clone(),
            },
            JournalRecord::Reverted { id: first.id, reverted_at: at },
        ])
        .unwrap();

        let reloaded = JournalRepository::new(temp.path().join("journal.jsonl"));
        reloaded.load().unwrap();
        let loaded = reloaded.get(first.id).unwrap().unwrap();
        assert!(loaded.is_reverted);
        assert_eq!(loaded.reverted_at, Some(at));
        assert_eq!(reloaded.verify().unwrap(), 2);
    }

    #[test]
    fn test_tampering_is_detected() {
        let (repo, temp) = create_test_repo();
        commit(&repo, &[JournalRecord::Entry { entry: entry(1) }])
            .unwrap();
        commit(&repo, &[JournalRecord::Entry { entry: entry(2) }])
            .unwrap();

        let path = temp.path().join("journal.jsonl");
        let contents = std::fs::read_to_string(&path).unwrap();
        let tampered = contents.replacen("\"10\"", "\"99\"", 1);
        assert_ne!(contents, tampered);
        std::fs::write(&path, tampered).unwrap();

        let reloaded = JournalRepository::new(path);
        let err = reloaded.load().unwrap_err();
        assert!(matches!(err, LedgerError::Integrity(_)));
    }

    #[test]
    fn test_deleted_line_is_detected() {
        let (repo, temp) = create_test_repo();
        for seq in 1..=3 {
            commit(&repo, &[JournalRecord::Entry { entry: entry(seq) }])
                .unwrap();
        }

        let path = temp.path().join("journal.jsonl");
        let contents = std::fs::read_to_string(&path).unwrap();
        let without_middle: Vec<&str> = contents
            .lines()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, l)| l)
            .collect();
        std::fs::write(&path, without_middle.join("\n")).unwrap();

        assert!(JournalRepository::new(path).load().is_err());
    }

    #[test]
    fn test_invalid_record_is_rejected_before_write() {
        let (repo, temp) = create_test_repo();
        let result = commit(&repo, &[JournalRecord::Reverted {
            id: JournalEntryId::new(),
            reverted_at: Utc::now(),
        }]);

        assert!(matches!(result, Err(LedgerError::Integrity(_))));
        assert!(!temp.path().join("journal.jsonl").exists());
        assert_eq!(repo.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_failed_append_leaves_memory_untouched() {
        let (repo, temp) = create_test_repo();
        std::fs::create_dir(temp.path().join("journal.jsonl")).unwrap();

        let result = commit(&repo, &[JournalRecord::Entry { entry: entry(1) }]);
        assert!(result.is_err());
        assert_eq!(repo.entry_count().unwrap(), 0);
        assert!(repo.last_position().unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let (repo, _temp) = create_test_repo();
        let a = entry(1);
        let b = entry(2);
        commit(&repo, &[
            JournalRecord::Entry { entry: a.clone() },
            JournalRecord::Entry { entry: b.clone() },
        ])
        .unwrap();

        let ids: Vec<_> = repo
            .list_newest_first()
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_torn_final_commit_is_discarded_on_load() {
        let (repo, temp) = create_test_repo();
        let first = entry(1);
        commit(&repo, &[JournalRecord::Entry { entry: first.clone() }]).unwrap();

        let path = temp.path().join("journal.jsonl");
        let intact = std::fs::read_to_string(&path).unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        std::io::Write::write_all(&mut file, b"{\"prev_hash\":\"ab").unwrap();

        let reloaded = JournalRepository::new(path.clone());
        assert!(matches!(reloaded.verify(), Err(LedgerError::Integrity(_))));
        reloaded.load().unwrap();
        assert_eq!(reloaded.entries().unwrap(), vec![first]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), intact);

        commit(&reloaded, &[JournalRecord::Entry { entry: entry(2) }]).unwrap();
        assert_eq!(JournalRepository::new(path).verify().unwrap(), 2);
    }

    #[test]
    fn test_price_writes_since_head() {
        let (repo, temp) = create_test_repo();
        let service = ServiceId::new();
        let mut prices = BTreeMap::new();
        prices.insert(service, Price::from_cents(11000));

        let prepared = repo
            .prepare(&prices, &[JournalRecord::Entry { entry: entry(1) }], Utc::now())
            .unwrap();
        let first_hash = prepared.hash().to_string();
        repo.append(prepared).unwrap();
        commit(&repo, &[JournalRecord::Entry { entry: entry(2) }]).unwrap();

        let reloaded = JournalRepository::new(temp.path().join("journal.jsonl"));
        reloaded.load().unwrap();

        let all = reloaded.price_writes_since(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].prices, prices);
        assert!(all[1].prices.is_empty());

        let newer = reloaded.price_writes_since(Some(&first_hash)).unwrap();
        assert_eq!(newer.len(), 1);
        let head = reloaded.head().unwrap();
        assert!(reloaded.price_writes_since(Some(&head)).unwrap().is_empty());
        assert!(matches!(
            reloaded.price_writes_since(Some("feedface")),
            Err(LedgerError::Integrity(_))
        ));
    }

    #[test]
    fn test_stale_prepared_commit_is_refused() {
        let (repo, _temp) = create_test_repo();
        let stale = repo
            .prepare(&BTreeMap::new(), &[JournalRecord::Entry { entry: entry(1) }], Utc::now())
            .unwrap();
        commit(&repo, &[JournalRecord::Entry { entry: entry(2) }]).unwrap();

        assert!(repo.append(stale).is_err());
        assert_eq!(repo.entry_count().unwrap(), 1);
    }
}
