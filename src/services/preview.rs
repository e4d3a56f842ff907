//! Preview service
//!
//! Simulates a bulk price change against the current catalog without
//! mutating anything. No lock is taken: the result is a best-effort snapshot
//! and may be stale by the time the change is applied.

use serde::Serialize;

use crate::error::LedgerResult;
use crate::models::{ChangeSpecification, Price};
use crate::storage::Storage;

use super::{plan_changes, PlannedChange};

/// Smallest and largest price in a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceRange {
    pub min: Price,
    pub max: Price,
}

impl PriceRange {
    /// The `{0, 0}` range reported for an empty selection
    pub fn empty() -> Self {
        Self {
            min: Price::zero(),
            max: Price::zero(),
        }
    }

    fn of(prices: impl Iterator<Item = Price>) -> Self {
        let mut range: Option<PriceRange> = None;
        for price in prices {
            range = Some(match range {
                None => PriceRange {
                    min: price,
                    max: price,
                },
                Some(r) => PriceRange {
                    min: r.min.min(price),
                    max: r.max.max(price),
                },
            });
        }
        range.unwrap_or_else(Self::empty)
    }
}

/// Impact of a prospective change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewResult {
    pub affected_count: usize,
    pub current_price_range: PriceRange,
    pub new_price_range: PriceRange,
    /// Per-service detail, ordered by service name
    pub changes: Vec<PlannedChange>,
}

/// Service for previewing bulk changes
pub struct PreviewService<'a> {
    storage: &'a Storage,
}

impl<'a> PreviewService<'a> {
    /// Create a new preview service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Report what applying `spec` would do right now
    ///
    /// An empty selection is not an error: it yields a zero count and
    /// `{0, 0}` ranges.
    pub fn compute_preview(&self, spec: &ChangeSpecification) -> LedgerResult<PreviewResult> {
        let entries = self.storage.catalog.list_entries(&spec.filter())?;
        let changes = plan_changes(entries, spec)?;

        let result = PreviewResult {
            affected_count: changes.len(),
            current_price_range: PriceRange::of(changes.iter().map(|c| c.old_price)),
            new_price_range: PriceRange::of(changes.iter().map(|c| c.new_price)),
            changes,
        };

        tracing::debug!(
            change = %spec.describe(),
            affected = result.affected_count,
            "preview computed"
        );
        Ok(result)
    }
}
