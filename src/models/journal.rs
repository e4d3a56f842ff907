//! Journal entry model
//!
//! A journal entry records one bulk price change (`Applied`) or the undo of
//! one (`Revert`). Entries are immutable once written except for the
//! `is_reverted`/`reverted_at` pair, which flips exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::change::{describe_change, Amount, ChangeKind};
use super::ids::{CategoryId, JournalEntryId, ServiceId};
use super::price::Price;

/// Whether an entry applied a change or undid one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Applied,
    Revert,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Applied => write!(f, "APPLIED"),
            RecordKind::Revert => write!(f, "REVERT"),
        }
    }
}

/// Total order position of a journal entry: `(created_at, sequence)`
pub type OrderKey = (DateTime<Utc>, u64);

/// One immutable record in the price journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier
    pub id: JournalEntryId,

    /// Monotonic tie-breaker for entries created in the same instant
    pub sequence: u64,

    pub record_kind: RecordKind,
    pub kind: ChangeKind,
    pub amount: Amount,
    pub is_percentage: bool,

    #[serde(default)]
    pub category_id: Option<CategoryId>,

    /// Category name as it was when the change was applied
    #[serde(default)]
    pub category_name: Option<String>,

    pub affected_count: usize,

    pub created_at: DateTime<Utc>,

    /// Price of each affected service before this entry took effect
    pub old_prices: BTreeMap<ServiceId, Price>,

    #[serde(default)]
    pub is_reverted: bool,

    #[serde(default)]
    pub reverted_at: Option<DateTime<Utc>>,

    /// For `Revert` entries, the entry that was undone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverts: Option<JournalEntryId>,
}

/// Everything about a journal entry except its position in the journal
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    pub record_kind: RecordKind,
    pub kind: ChangeKind,
    pub amount: Amount,
    pub is_percentage: bool,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub old_prices: BTreeMap<ServiceId, Price>,
    pub reverts: Option<JournalEntryId>,
}

impl NewJournalEntry {
    /// Stamp the draft with its id and journal position
    pub fn into_entry(self, sequence: u64, created_at: DateTime<Utc>) -> JournalEntry {
        JournalEntry {
            id: JournalEntryId::new(),
            sequence,
            record_kind: self.record_kind,
            kind: self.kind,
            amount: self.amount,
            is_percentage: self.is_percentage,
            category_id: self.category_id,
            category_name: self.category_name,
            affected_count: self.old_prices.len(),
            created_at,
            old_prices: self.old_prices,
            is_reverted: false,
            reverted_at: None,
            reverts: self.reverts,
        }
    }
}

impl JournalEntry {
    /// Position of this entry in the journal's total order
    pub fn order_key(&self) -> OrderKey {
        (self.created_at, self.sequence)
    }

    /// Whether this entry was created strictly after `other`
    pub fn is_newer_than(&self, other: &JournalEntry) -> bool {
        self.order_key() > other.order_key()
    }

    /// Whether this entry undoes another one
    pub fn is_revert(&self) -> bool {
        self.record_kind == RecordKind::Revert
    }

    /// Mark this entry as reverted
    pub fn mark_reverted(&mut self, at: DateTime<Utc>) {
        self.is_reverted = true;
        self.reverted_at = Some(at);
    }

    /// Human-readable scope, e.g. "all categories" or "category 'Hair'"
    pub fn scope(&self) -> String {
        match (&self.category_name, self.category_id) {
            (Some(name), _) => format!("category '{}'", name),
            (None, Some(id)) => format!("category {}", id),
            (None, None) => "all categories".to_string(),
        }
    }

    /// Signed change description, e.g. "+10%"
    pub fn describe_change(&self) -> String {
        describe_change(self.kind, self.amount, self.is_percentage)
    }

    /// Check the structural invariants of a stored entry
    pub fn validate(&self) -> Result<(), JournalValidationError> {
        if self.affected_count != self.old_prices.len() {
            return Err(JournalValidationError::CountMismatch {
                affected_count: self.affected_count,
                snapshot_len: self.old_prices.len(),
            });
        }
        if self.is_reverted != self.reverted_at.is_some() {
            return Err(JournalValidationError::RevertFlagMismatch);
        }
        if self.is_revert() && self.is_reverted {
            return Err(JournalValidationError::RevertedRevert);
        }
        Ok(())
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {} on {} ({} services)",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.record_kind,
            self.id,
            self.describe_change(),
            self.scope(),
            self.affected_count
        );

        if let Some(source) = self.reverts {
            output.push_str(&format!("\n  Reverts: {}", source));
        }
        if let Some(at) = self.reverted_at {
            output.push_str(&format!(
                "\n  Reverted at {}",
                at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        output
    }
}

/// Sort entries newest first
pub fn sort_newest_first(entries: &mut [JournalEntry]) {
    entries.sort_by_key(|e| std::cmp::Reverse(e.order_key()));
}

/// Entries that must be reverted before `target` may be, newest first
///
/// Revert entries are terminal and never block; every newer `Applied` entry
/// that is still in effect does.
pub fn blocking_entries(entries: &[JournalEntry], target: &JournalEntry) -> Vec<JournalEntryId> {
    let mut blockers: Vec<&JournalEntry> = entries
        .iter()
        .filter(|e| e.is_newer_than(target) && !e.is_revert() && !e.is_reverted)
        .collect();
    blockers.sort_by_key(|e| std::cmp::Reverse(e.order_key()));
    blockers.into_iter().map(|e| e.id).collect()
}

/// Structural problems with a stored journal entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalValidationError {
    CountMismatch {
        affected_count: usize,
        snapshot_len: usize,
    },
    RevertFlagMismatch,
    RevertedRevert,
}

impl fmt::Display for JournalValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountMismatch {
                affected_count,
                snapshot_len,
            } => write!(
                f,
                "affected count {} does not match snapshot size {}",
                affected_count, snapshot_len
            ),
            Self::RevertFlagMismatch => write!(f, "reverted flag and timestamp disagree"),
            Self::RevertedRevert => write!(f, "revert entry is marked as reverted"),
        }
    }
}

impl std::error::Error for JournalValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft(kind: RecordKind) -> NewJournalEntry {
        let mut old_prices = BTreeMap::new();
        old_prices.insert(ServiceId::new(), Price::from_cents(10000));
        NewJournalEntry {
            record_kind: kind,
            kind: ChangeKind::Increase,
            amount: Amount::parse("10").unwrap(),
            is_percentage: true,
            category_id: None,
            category_name: None,
            old_prices,
            reverts: None,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_into_entry_counts_snapshot() {
        let entry = draft(RecordKind::Applied).into_entry(1, at(0));
        assert_eq!(entry.affected_count, 1);
        assert!(!entry.is_reverted);
        assert!(entry.reverted_at.is_none());
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_sequence_breaks_timestamp_ties() {
        let a = draft(RecordKind::Applied).into_entry(1, at(0));
        let b = draft(RecordKind::Applied).into_entry(2, at(0));
        assert!(b.is_newer_than(&a));
        assert!(!a.is_newer_than(&b));
    }

    #[test]
    fn test_blocking_entries_ignores_reverts_and_reverted() {
        let target = draft(RecordKind::Applied).into_entry(1, at(0));
        let mut undone = draft(RecordKind::Applied).into_entry(2, at(1));
        undone.mark_reverted(at(3));
        let counter = draft(RecordKind::Revert).into_entry(3, at(3));
        let live = draft(RecordKind::Applied).into_entry(4, at(4));
        let older = draft(RecordKind::Applied).into_entry(0, at(-1));

        let all = vec![
            older.clone(),
            target.clone(),
            undone,
            counter,
            live.clone(),
        ];
        assert_eq!(blocking_entries(&all, &target), vec![live.id]);
        assert!(blocking_entries(&all, &live).is_empty());
    }

    #[test]
    fn test_sort_newest_first() {
        let a = draft(RecordKind::Applied).into_entry(1, at(0));
        let b = draft(RecordKind::Applied).into_entry(2, at(0));
        let c = draft(RecordKind::Applied).into_entry(3, at(5));
        let mut entries = vec![b.clone(), c.clone(), a.clone()];
        sort_newest_first(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn test_validate_catches_bad_flags() {
        let mut entry = draft(RecordKind::Revert).into_entry(1, at(0));
        entry.is_reverted = true;
        assert_eq!(
            entry.validate(),
            Err(JournalValidationError::RevertFlagMismatch)
        );
        entry.reverted_at = Some(at(1));
        assert_eq!(entry.validate(), Err(JournalValidationError::RevertedRevert));
    }

    #[test]
    fn test_human_readable_format() {
        let entry = draft(RecordKind::Applied).into_entry(1, at(0));
        let text = entry.format_human_readable();
        assert!(text.contains("APPLIED"));
        assert!(text.contains("+10%"));
        assert!(text.contains("all categories"));
        assert!(text.contains("(1 services)"));
    }
}
