//! Catalog service
//!
//! Lookups over the service catalog and the CSV import that seeds it. Import
//! is the only path that creates services or categories; prices of existing
//! services are otherwise changed only by bulk updates and reverts.

use std::io::Read;

use csv::{Reader, StringRecord};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryId, EntryFilter, Price, ServiceCatalogEntry};
use crate::storage::Storage;

/// Expected CSV header, in order
pub const IMPORT_COLUMNS: [&str; 4] = ["name", "price", "category", "active"];

/// One parsed catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub name: String,
    pub price: Price,
    pub category: Option<String>,
    pub is_active: bool,
    pub row_number: usize,
}

/// Outcome of a catalog import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub categories_created: usize,
    pub services_created: usize,
    pub services_updated: usize,
}

/// Service for catalog lookups and import
pub struct CatalogService<'a> {
    storage: &'a Storage,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// List services, optionally restricted to a category and to active ones
    pub fn list_entries(&self, filter: &EntryFilter) -> LedgerResult<Vec<ServiceCatalogEntry>> {
        self.storage.catalog.list_entries(filter)
    }

    /// List all categories
    pub fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        self.storage.catalog.get_all_categories()
    }

    /// Find a category by name, full ID or short ID
    pub fn find_category(&self, identifier: &str) -> LedgerResult<Option<Category>> {
        if let Some(category) = self.storage.catalog.get_category_by_name(identifier)? {
            return Ok(Some(category));
        }

        if let Ok(id) = identifier.parse::<CategoryId>() {
            return self.storage.catalog.get_category(id);
        }

        let matches: Vec<Category> = self
            .storage
            .catalog
            .get_all_categories()?
            .into_iter()
            .filter(|c| c.id.matches_short(identifier))
            .collect();
        unique_match(matches, "category", identifier)
    }

    /// Resolve a category identifier or fail with `NotFound`
    pub fn resolve_category(&self, identifier: &str) -> LedgerResult<Category> {
        self.find_category(identifier)?
            .ok_or_else(|| LedgerError::category_not_found(identifier))
    }

    /// Parse catalog rows from CSV
    ///
    /// Every row is checked before anything is returned; the first bad row
    /// fails the whole parse with its 1-based data row number.
    pub fn parse_csv<R: Read>(&self, reader: &mut Reader<R>) -> LedgerResult<Vec<CatalogRow>> {
        let headers = reader
            .headers()
            .map_err(|e| LedgerError::Import(format!("Failed to read CSV header: {}", e)))?
            .clone();
        let columns = ColumnIndex::from_headers(&headers)?;

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 1;
            let record = result.map_err(|e| {
                LedgerError::Import(format!("Error reading CSV row {}: {}", row_number, e))
            })?;
            let row = columns
                .parse_record(&record, row_number)
                .map_err(|e| LedgerError::Import(format!("Row {}: {}", row_number, e)))?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Import catalog rows, creating categories by name as needed
    ///
    /// Rows naming an existing service update it in place. The catalog is
    /// saved once, after every row has been validated.
    pub fn import_rows(&self, rows: Vec<CatalogRow>) -> LedgerResult<ImportSummary> {
        let _guard = self.storage.lock_mutations()?;
        let catalog = &self.storage.catalog;
        let mut summary = ImportSummary::default();

        let mut staged: Vec<ServiceCatalogEntry> = Vec::with_capacity(rows.len());
        let mut new_categories: Vec<Category> = Vec::new();

        for row in rows {
            let category_id = match row.category.as_deref() {
                None => None,
                Some(name) => {
                    let existing = catalog.get_category_by_name(name)?.or_else(|| {
                        new_categories
                            .iter()
                            .find(|c| c.name.eq_ignore_ascii_case(name))
                            .cloned()
                    });
                    match existing {
                        Some(category) => Some(category.id),
                        None => {
                            let category = Category::new(name);
                            category.validate().map_err(|e| {
                                LedgerError::Import(format!("Row {}: {}", row.row_number, e))
                            })?;
                            let id = category.id;
                            new_categories.push(category);
                            Some(id)
                        }
                    }
                }
            };

            // A later row for the same name wins
            let in_file = staged
                .iter()
                .position(|s| s.name.eq_ignore_ascii_case(&row.name));
            let mut entry = match in_file {
                Some(pos) => staged.remove(pos),
                None => match catalog.get_entry_by_name(&row.name)? {
                    Some(existing) => {
                        summary.services_updated += 1;
                        existing
                    }
                    None => {
                        summary.services_created += 1;
                        ServiceCatalogEntry::new(&row.name, row.price, category_id)
                    }
                },
            };

            entry.price = row.price;
            entry.category_id = category_id;
            entry.is_active = row.is_active;
            entry.updated_at = chrono::Utc::now();
            entry
                .validate()
                .map_err(|e| LedgerError::Import(format!("Row {}: {}", row.row_number, e)))?;
            staged.push(entry);
        }

        summary.categories_created = new_categories.len();
        for category in new_categories {
            catalog.upsert_category(category)?;
        }
        for entry in staged {
            catalog.upsert_entry(entry)?;
        }
        catalog.save()?;

        tracing::info!(
            categories = summary.categories_created,
            created = summary.services_created,
            updated = summary.services_updated,
            "catalog imported"
        );
        Ok(summary)
    }

    /// Parse and import a CSV catalog in one step
    pub fn import_csv<R: Read>(&self, reader: &mut Reader<R>) -> LedgerResult<ImportSummary> {
        let rows = self.parse_csv(reader)?;
        self.import_rows(rows)
    }
}

fn unique_match<T>(mut matches: Vec<T>, what: &str, identifier: &str) -> LedgerResult<Option<T>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        n => Err(LedgerError::Validation(format!(
            "'{}' matches {} {} records; use a longer ID",
            identifier, n, what
        ))),
    }
}

/// Column positions resolved from the CSV header
struct ColumnIndex {
    name: usize,
    price: usize,
    category: Option<usize>,
    active: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> LedgerResult<Self> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
        };

        let name = find(IMPORT_COLUMNS[0])
            .ok_or_else(|| LedgerError::Import("CSV header is missing 'name'".into()))?;
        let price = find(IMPORT_COLUMNS[1])
            .ok_or_else(|| LedgerError::Import("CSV header is missing 'price'".into()))?;

        Ok(Self {
            name,
            price,
            category: find(IMPORT_COLUMNS[2]),
            active: find(IMPORT_COLUMNS[3]),
        })
    }

    fn parse_record(&self, record: &StringRecord, row_number: usize) -> Result<CatalogRow, String> {
        let name = record
            .get(self.name)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "missing service name".to_string())?
            .to_string();

        let price_str = record
            .get(self.price)
            .map(str::trim)
            .ok_or_else(|| "missing price".to_string())?;
        let price = Price::parse(price_str).map_err(|e| format!("{}: {}", price_str, e))?;

        let category = self
            .category
            .and_then(|col| record.get(col))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let is_active = match self.active.and_then(|col| record.get(col)).map(str::trim) {
            None | Some("") => true,
            Some(flag) => parse_flag(flag).ok_or_else(|| format!("invalid active flag: {}", flag))?,
        };

        Ok(CatalogRow {
            name,
            price,
            category,
            is_active,
            row_number,
        })
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::create_test_storage;

    fn reader(data: &str) -> Reader<&[u8]> {
        Reader::from_reader(data.as_bytes())
    }

    #[test]
    fn test_parse_csv() {
        let (_temp, storage) = create_test_storage();
        let service = CatalogService::new(&storage);
        let rows = service
            .parse_csv(&mut reader(
                "name,price,category,active\nCut,$30.00,Hair,true\nPerm,95,Hair,no\nNails,20,,\n",
            ))
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].price, Price::parse("30").unwrap());
        assert_eq!(rows[1].category.as_deref(), Some("Hair"));
        assert!(!rows[1].is_active);
        assert!(rows[2].category.is_none());
        assert!(rows[2].is_active);
    }

    #[test]
    fn test_parse_csv_rejects_bad_row() {
        let (_temp, storage) = create_test_storage();
        let service = CatalogService::new(&storage);
        let err = service
            .parse_csv(&mut reader("name,price\nCut,30\nColor,-5\n"))
            .unwrap_err();
        assert!(err.to_string().contains("Row 2"));
    }

    #[test]
    fn test_parse_csv_requires_price_column() {
        let (_temp, storage) = create_test_storage();
        let err = CatalogService::new(&storage)
            .parse_csv(&mut reader("name,category\nCut,Hair\n"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Import(_)));
    }

    #[test]
    fn test_import_creates_and_updates() {
        let (_temp, storage) = create_test_storage();
        let service = CatalogService::new(&storage);

        let first = service
            .import_csv(&mut reader("name,price,category\nCut,30,Hair\nColor,80,hair\n"))
            .unwrap();
        assert_eq!(
            first,
            ImportSummary {
                categories_created: 1,
                services_created: 2,
                services_updated: 0
            }
        );

        let second = service
            .import_csv(&mut reader("name,price,category\ncut,35,Hair\nNails,20,Nails\n"))
            .unwrap();
        assert_eq!(second.services_updated, 1);
        assert_eq!(second.services_created, 1);
        assert_eq!(second.categories_created, 1);

        assert_eq!(storage.catalog.service_count().unwrap(), 3);
        let cut = storage.catalog.get_entry_by_name("Cut").unwrap().unwrap();
        assert_eq!(cut.price, Price::parse("35").unwrap());
    }

    #[test]
    fn test_find_category_by_short_id() {
        let (_temp, storage) = create_test_storage();
        let service = CatalogService::new(&storage);
        service
            .import_csv(&mut reader("name,price,category\nCut,30,Hair\n"))
            .unwrap();

        let hair = service.find_category("hair").unwrap().unwrap();
        let by_short = service.find_category(&hair.id.to_string()).unwrap().unwrap();
        assert_eq!(by_short.id, hair.id);

        let err = service.resolve_category("Nails").unwrap_err();
        assert!(err.is_not_found());
    }
}
