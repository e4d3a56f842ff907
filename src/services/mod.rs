//! Service layer for the price ledger
//!
//! The service layer provides business logic on top of the storage layer:
//! previewing, applying, and reverting bulk price changes, reading the
//! journal, and maintaining the catalog fixture data.

pub mod bulk_update;
pub mod catalog;
pub mod journal;
pub mod preview;
pub mod revert;

pub use bulk_update::BulkUpdateService;
pub use catalog::CatalogService;
pub use journal::{JournalService, RevertEligibility};
pub use preview::{PreviewResult, PreviewService, PriceRange};
pub use revert::RevertService;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{ChangeSpecification, Price, ServiceCatalogEntry, ServiceId};

/// The effect a change would have on one catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    pub service_id: ServiceId,
    pub name: String,
    pub old_price: Price,
    pub new_price: Price,
}

/// Select the entries a change touches and compute their new prices
///
/// Preview and apply both go through here, so they always agree on which
/// entries are affected and what each new price is.
pub(crate) fn plan_changes<I>(entries: I, spec: &ChangeSpecification) -> LedgerResult<Vec<PlannedChange>>
where
    I: IntoIterator<Item = ServiceCatalogEntry>,
{
    entries
        .into_iter()
        .filter(|entry| spec.selects(entry))
        .map(|entry| {
            let new_price = spec
                .apply_to(entry.price)
                .map_err(|e| LedgerError::Validation(format!("{}: {}", entry.name, e)))?;
            Ok(PlannedChange {
                service_id: entry.id,
                name: entry.name,
                old_price: entry.price,
                new_price,
            })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, ChangeKind};

    #[test]
    fn test_plan_skips_unselected_entries() {
        let active = ServiceCatalogEntry::new("Cut", Price::from_cents(10000), None);
        let mut inactive = ServiceCatalogEntry::new("Perm", Price::from_cents(5000), None);
        inactive.is_active = false;

        let spec = ChangeSpecification::new(ChangeKind::Increase, Amount::parse("10").unwrap(), true);
        let planned = plan_changes(vec![active.clone(), inactive], &spec).unwrap();

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].service_id, active.id);
        assert_eq!(planned[0].new_price, Price::from_cents(11000));
    }
}
