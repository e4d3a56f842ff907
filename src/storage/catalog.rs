//! Service catalog repository for JSON storage
//!
//! Holds the category directory and the service entries in catalog.json.
//! Prices are only ever rewritten through a `LedgerTransaction`. The file
//! also records the hash of the last journal commit it reflects.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::LedgerError;
use crate::models::{Category, CategoryId, EntryFilter, Price, ServiceCatalogEntry, ServiceId};

use super::file_io::{read_json, stage_json, write_json_atomic, StagedFile};
use super::journal::PriceRedo;

/// Serializable catalog data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CatalogData {
    pub categories: Vec<Category>,
    pub services: Vec<ServiceCatalogEntry>,
    /// Hash of the newest journal commit these prices include
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_head: Option<String>,
}

/// Repository for catalog persistence
pub struct CatalogRepository {
    path: PathBuf,
    categories: RwLock<HashMap<CategoryId, Category>>,
    services: RwLock<HashMap<ServiceId, ServiceCatalogEntry>>,
    journal_head: RwLock<Option<String>>,
}

impl CatalogRepository {
    /// Create a new catalog repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            categories: RwLock::new(HashMap::new()),
            services: RwLock::new(HashMap::new()),
            journal_head: RwLock::new(None),
        }
    }

    /// Load the catalog from disk
    pub fn load(&self) -> Result<(), LedgerError> {
        let file_data: CatalogData = read_json(&self.path)?;
        self.install(file_data)
    }

    /// Save the catalog to disk
    pub fn save(&self) -> Result<(), LedgerError> {
        let data = self.data()?;
        write_json_atomic(&self.path, &data)
    }

    /// Current contents in a stable, serializable order
    pub fn data(&self) -> Result<CatalogData, LedgerError> {
        let categories = self
            .categories
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        let services = self
            .services
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut category_list: Vec<_> = categories.values().cloned().collect();
        category_list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let mut service_list: Vec<_> = services.values().cloned().collect();
        service_list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(CatalogData {
            categories: category_list,
            services: service_list,
            journal_head: self.journal_head()?,
        })
    }

    /// Hash of the newest journal commit the catalog reflects
    pub fn journal_head(&self) -> Result<Option<String>, LedgerError> {
        let head = self
            .journal_head
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(head.clone())
    }

    /// Replace the in-memory catalog
    pub(crate) fn install(&self, data: CatalogData) -> Result<(), LedgerError> {
        let mut categories = self
            .categories
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut services = self
            .services
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut journal_head = self
            .journal_head
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        categories.clear();
        services.clear();
        *journal_head = data.journal_head;

        for category in data.categories {
            categories.insert(category.id, category);
        }
        for service in data.services {
            services.insert(service.id, service);
        }

        Ok(())
    }

    /// Catalog contents with the given prices written over the current ones
    ///
    /// Fails with `NotFound` if any price targets a service that no longer
    /// exists, so a caller can never partially apply a batch.
    pub(crate) fn with_prices(
        &self,
        prices: &BTreeMap<ServiceId, Price>,
        at: DateTime<Utc>,
    ) -> Result<CatalogData, LedgerError> {
        let mut data = self.data()?;
        let mut remaining = prices.clone();

        for service in data.services.iter_mut() {
            if let Some(price) = remaining.remove(&service.id) {
                service.price = price;
                service.updated_at = at;
            }
        }

        if let Some(missing) = remaining.keys().next() {
            return Err(LedgerError::service_not_found(missing.to_string()));
        }

        Ok(data)
    }

    /// Catalog contents brought forward over commits it has not seen yet
    ///
    /// Services removed since a commit are skipped; the rest take the price
    /// of the newest commit that wrote them.
    pub(crate) fn with_redo(&self, commits: &[PriceRedo]) -> Result<CatalogData, LedgerError> {
        let mut data = self.data()?;

        for commit in commits {
            for service in data.services.iter_mut() {
                if let Some(price) = commit.prices.get(&service.id) {
                    service.price = *price;
                    service.updated_at = commit.committed_at;
                }
            }
            let missing = commit
                .prices
                .keys()
                .filter(|id| !data.services.iter().any(|s| s.id == **id))
                .count();
            if missing > 0 {
                tracing::warn!(
                    commit = %commit.hash,
                    missing,
                    "skipping journaled prices for services no longer in the catalog"
                );
            }
            data.journal_head = Some(commit.hash.clone());
        }

        Ok(data)
    }

    /// Write catalog contents to a temp file without touching memory
    pub(crate) fn stage_file(&self, data: &CatalogData) -> Result<StagedFile, LedgerError> {
        stage_json(&self.path, data)
    }

    /// Write catalog contents to disk without touching memory
    pub(crate) fn write_file(&self, data: &CatalogData) -> Result<(), LedgerError> {
        write_json_atomic(&self.path, data)
    }

    // Service operations

    /// List services passing `filter`, ordered by name
    pub fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<ServiceCatalogEntry>, LedgerError> {
        let services = self
            .services
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut list: Vec<_> = services
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    /// Get a service by ID
    pub fn get_entry(&self, id: ServiceId) -> Result<Option<ServiceCatalogEntry>, LedgerError> {
        let services = self
            .services
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(services.get(&id).cloned())
    }

    /// Get a service by name (case-insensitive)
    pub fn get_entry_by_name(&self, name: &str) -> Result<Option<ServiceCatalogEntry>, LedgerError> {
        let services = self
            .services
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let name_lower = name.to_lowercase();
        Ok(services
            .values()
            .find(|s| s.name.to_lowercase() == name_lower)
            .cloned())
    }

    /// Insert or update a service
    pub fn upsert_entry(&self, service: ServiceCatalogEntry) -> Result<(), LedgerError> {
        let mut services = self
            .services
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        services.insert(service.id, service);
        Ok(())
    }

    /// Count services
    pub fn service_count(&self) -> Result<usize, LedgerError> {
        let services = self
            .services
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(services.len())
    }

    // Category operations

    /// Name of a category, if it exists
    pub fn category_name(&self, id: CategoryId) -> Result<Option<String>, LedgerError> {
        Ok(self.get_category(id)?.map(|c| c.name))
    }

    /// Get a category by ID
    pub fn get_category(&self, id: CategoryId) -> Result<Option<Category>, LedgerError> {
        let categories = self
            .categories
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(categories.get(&id).cloned())
    }

    /// Get a category by name (case-insensitive)
    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>, LedgerError> {
        let categories = self
            .categories
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let name_lower = name.to_lowercase();
        Ok(categories
            .values()
            .find(|c| c.name.to_lowercase() == name_lower)
            .cloned())
    }

    /// Get all categories, ordered by name
    pub fn get_all_categories(&self) -> Result<Vec<Category>, LedgerError> {
        Ok(self.data()?.categories)
    }

    /// Insert or update a category
    pub fn upsert_category(&self, category: Category) -> Result<(), LedgerError> {
        let mut categories = self
            .categories
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        categories.insert(category.id, category);
        Ok(())
    }

    /// Count categories
    pub fn category_count(&self) -> Result<usize, LedgerError> {
        let categories = self
            .categories
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(categories.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, CatalogRepository) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");
        let repo = CatalogRepository::new(path);
        (temp_dir, repo)
    }

    #[test]
    fn test_empty_load() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();
        assert_eq!(repo.service_count().unwrap(), 0);
        assert_eq!(repo.category_count().unwrap(), 0);
    }

    #[test]
    fn test_list_entries_filters() {
        let (_temp_dir, repo) = create_test_repo();
        let hair = Category::new("Hair");
        repo.upsert_category(hair.clone()).unwrap();

        let cut = ServiceCatalogEntry::new("Cut", Price::from_cents(3000), Some(hair.id));
        let mut retired = ServiceCatalogEntry::new("Perm", Price::from_cents(9000), Some(hair.id));
        retired.is_active = false;
        let nails = ServiceCatalogEntry::new("Nails", Price::from_cents(2000), None);
        repo.upsert_entry(cut.clone()).unwrap();
        repo.upsert_entry(retired).unwrap();
        repo.upsert_entry(nails).unwrap();

        assert_eq!(repo.list_entries(&EntryFilter::all()).unwrap().len(), 3);

        let active_hair = repo
            .list_entries(&EntryFilter {
                category_id: Some(hair.id),
                is_active: Some(true),
            })
            .unwrap();
        assert_eq!(active_hair.len(), 1);
        assert_eq!(active_hair[0].id, cut.id);
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, repo) = create_test_repo();
        let hair = Category::new("Hair");
        let cut = ServiceCatalogEntry::new("Cut", Price::parse("30.125").unwrap(), Some(hair.id));
        repo.upsert_category(hair.clone()).unwrap();
        repo.upsert_entry(cut.clone()).unwrap();
        repo.save().unwrap();

        let repo2 = CatalogRepository::new(temp_dir.path().join("catalog.json"));
        repo2.load().unwrap();
        assert_eq!(repo2.category_name(hair.id).unwrap().as_deref(), Some("Hair"));
        let loaded = repo2.get_entry(cut.id).unwrap().unwrap();
        assert_eq!(loaded.price, Price::parse("30.125").unwrap());
    }

    #[test]
    fn test_with_prices_does_not_touch_memory() {
        let (_temp_dir, repo) = create_test_repo();
        let cut = ServiceCatalogEntry::new("Cut", Price::from_cents(3000), None);
        repo.upsert_entry(cut.clone()).unwrap();

        let mut prices = BTreeMap::new();
        prices.insert(cut.id, Price::from_cents(3300));
        let data = repo.with_prices(&prices, Utc::now()).unwrap();

        assert_eq!(data.services[0].price, Price::from_cents(3300));
        assert_eq!(
            repo.get_entry(cut.id).unwrap().unwrap().price,
            Price::from_cents(3000)
        );
    }

    #[test]
    fn test_with_prices_rejects_missing_service() {
        let (_temp_dir, repo) = create_test_repo();
        let mut prices = BTreeMap::new();
        prices.insert(ServiceId::new(), Price::from_cents(100));

        let err = repo.with_prices(&prices, Utc::now()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_redo_brings_prices_forward() {
        let (temp_dir, repo) = create_test_repo();
        let cut = ServiceCatalogEntry::new("Cut", Price::from_cents(3000), None);
        let color = ServiceCatalogEntry::new("Color", Price::from_cents(5000), None);
        repo.upsert_entry(cut.clone()).unwrap();
        repo.upsert_entry(color.clone()).unwrap();

        let at = Utc::now();
        let commit = |hash: &str, prices: Vec<(ServiceId, u64)>| PriceRedo {
            hash: hash.to_string(),
            committed_at: at,
            prices: prices
                .into_iter()
                .map(|(id, cents)| (id, Price::from_cents(cents)))
                .collect(),
        };
        let commits = vec![
            commit("aa", vec![(cut.id, 3300), (color.id, 5500)]),
            commit("bb", vec![(cut.id, 3000), (ServiceId::new(), 100)]),
        ];

        let data = repo.with_redo(&commits).unwrap();
        assert_eq!(data.journal_head.as_deref(), Some("bb"));
        let price = |id: ServiceId| data.services.iter().find(|s| s.id == id).unwrap().price;
        assert_eq!(price(cut.id), Price::from_cents(3000));
        assert_eq!(price(color.id), Price::from_cents(5500));

        repo.write_file(&data).unwrap();
        let repo2 = CatalogRepository::new(temp_dir.path().join("catalog.json"));
        repo2.load().unwrap();
        assert_eq!(repo2.journal_head().unwrap().as_deref(), Some("bb"));
        assert_eq!(repo.journal_head().unwrap(), None);
    }

    #[test]
    fn test_get_by_name() {
        let (_temp_dir, repo) = create_test_repo();
        repo.upsert_category(Category::new("Hair Care")).unwrap();
        repo.upsert_entry(ServiceCatalogEntry::new("Beard Trim", Price::zero(), None))
            .unwrap();

        assert!(repo.get_category_by_name("hair care").unwrap().is_some());
        assert!(repo.get_entry_by_name("BEARD TRIM").unwrap().is_some());
    }
}
