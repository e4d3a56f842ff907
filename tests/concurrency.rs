use std::path::Path;
use std::thread;

use price_ledger::config::paths::LedgerPaths;
use price_ledger::models::{Amount, ChangeKind, ChangeSpecification, Price, ServiceCatalogEntry, ServiceId};
use price_ledger::services::{BulkUpdateService, RevertService};
use price_ledger::storage::Storage;
use price_ledger::LedgerError;
use tempfile::TempDir;

fn open(dir: &Path) -> Storage {
    let mut storage = Storage::new(LedgerPaths::with_base_dir(dir.to_path_buf())).unwrap();
    storage.load_all().unwrap();
    storage
}

fn seeded(price: &str) -> (TempDir, ServiceId) {
    let temp = TempDir::new().unwrap();
    let storage = open(temp.path());
    let service = ServiceCatalogEntry::new("Cut", Price::parse(price).unwrap(), None);
    let id = service.id;
    storage.catalog.upsert_entry(service).unwrap();
    storage.catalog.save().unwrap();
    (temp, id)
}

fn change(kind: ChangeKind, amount: &str, pct: bool) -> ChangeSpecification {
    ChangeSpecification::new(kind, Amount::parse(amount).unwrap(), pct)
}

fn price_on_disk(dir: &Path, id: ServiceId) -> Price {
    open(dir).catalog.get_entry(id).unwrap().unwrap().price
}

#[test]
fn test_two_handles_loaded_together_do_not_lose_updates() {
    let (temp, id) = seeded("100");
    let first = open(temp.path());
    let second = open(temp.path());

    let increase = change(ChangeKind::Increase, "10", true);
    BulkUpdateService::new(&first).apply(&increase).unwrap();
    let later = BulkUpdateService::new(&second).apply(&increase).unwrap();

    assert_eq!(later.old_prices.get(&id), Some(&Price::parse("110").unwrap()));
    assert_eq!(price_on_disk(temp.path(), id), Price::parse("121").unwrap());

    let reopened = open(temp.path());
    assert_eq!(reopened.journal.entry_count().unwrap(), 2);
    assert_eq!(reopened.journal.verify().unwrap(), 2);
}

#[test]
fn test_concurrent_applies_across_threads_and_handles() {
    let (temp, id) = seeded("100");
    let shared = open(temp.path());
    let own_a = open(temp.path());
    let own_b = open(temp.path());

    thread::scope(|scope| {
        for storage in [&shared, &shared, &own_a, &own_b] {
            scope.spawn(move || {
                for _ in 0..5 {
                    BulkUpdateService::new(storage)
                        .apply(&change(ChangeKind::Increase, "1", false))
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(price_on_disk(temp.path(), id), Price::parse("120").unwrap());
    let reopened = open(temp.path());
    assert_eq!(reopened.journal.entry_count().unwrap(), 20);

    // Undo everything newest first, alternating between stale handles
    let handles = [&shared, &own_a, &own_b];
    for (i, entry) in reopened.journal.list_newest_first().unwrap().iter().enumerate() {
        RevertService::new(handles[i % handles.len()])
            .revert(entry.id)
            .unwrap();
    }

    assert_eq!(price_on_disk(temp.path(), id), Price::parse("100").unwrap());
    assert_eq!(open(temp.path()).journal.entry_count().unwrap(), 40);
}

#[test]
fn test_revert_racing_apply_on_same_service_is_serialized() {
    let (temp, id) = seeded("100");
    let setup = open(temp.path());
    let applied = BulkUpdateService::new(&setup)
        .apply(&change(ChangeKind::Increase, "10", true))
        .unwrap();

    let reverter = open(temp.path());
    let updater = open(temp.path());

    let (reverted, _) = thread::scope(|scope| {
        let revert = scope.spawn(|| RevertService::new(&reverter).revert(applied.id));
        let apply = scope.spawn(|| {
            BulkUpdateService::new(&updater)
                .apply(&change(ChangeKind::Increase, "5", false))
                .unwrap()
        });
        (revert.join().unwrap(), apply.join().unwrap())
    });

    // Either order is valid, but the outcome must match one of them exactly
    let final_price = price_on_disk(temp.path(), id);
    match reverted {
        Ok(_) => assert_eq!(final_price, Price::parse("105").unwrap()),
        Err(LedgerError::OutOfOrderRevert { .. }) => {
            assert_eq!(final_price, Price::parse("115").unwrap())
        }
        Err(other) => panic!("unexpected revert error: {:?}", other),
    }
    assert!(open(temp.path()).journal.verify().is_ok());
}
