//! Service catalog models
//!
//! The catalog itself is owned by the surrounding application. The ledger only
//! reads entries and rewrites their `price`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CategoryId, ServiceId};
use super::price::Price;

/// A category in the category directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,

    /// Category name
    pub name: String,

    /// When the category was created
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    /// Validate the category
    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if self.name.trim().is_empty() {
            return Err(CatalogValidationError::EmptyName);
        }
        if self.name.len() > 50 {
            return Err(CatalogValidationError::NameTooLong(self.name.len()));
        }
        Ok(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One sellable service in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCatalogEntry {
    /// Unique identifier
    pub id: ServiceId,

    /// Display name
    pub name: String,

    /// Current price
    pub price: Price,

    /// Owning category, if any
    #[serde(default)]
    pub category_id: Option<CategoryId>,

    /// Inactive services are never touched by bulk changes
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// When the service was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl ServiceCatalogEntry {
    /// Create a new active service
    pub fn new(name: impl Into<String>, price: Price, category_id: Option<CategoryId>) -> Self {
        Self {
            id: ServiceId::new(),
            name: name.into(),
            price,
            category_id,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    /// Validate the service
    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if self.name.trim().is_empty() {
            return Err(CatalogValidationError::EmptyName);
        }
        if self.name.len() > 100 {
            return Err(CatalogValidationError::NameTooLong(self.name.len()));
        }
        Ok(())
    }
}

impl fmt::Display for ServiceCatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Filter accepted by `list_entries`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub category_id: Option<CategoryId>,
    pub is_active: Option<bool>,
}

impl EntryFilter {
    /// A filter that matches every entry
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether an entry passes this filter
    pub fn matches(&self, entry: &ServiceCatalogEntry) -> bool {
        let active_ok = self.is_active.map_or(true, |a| entry.is_active == a);
        let category_ok = self
            .category_id
            .map_or(true, |c| entry.category_id == Some(c));
        active_ok && category_ok
    }
}

/// Validation errors for catalog models
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    EmptyName,
    NameTooLong(usize),
}

impl fmt::Display for CatalogValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Name cannot be empty"),
            Self::NameTooLong(len) => write!(f, "Name too long ({} characters)", len),
        }
    }
}

impl std::error::Error for CatalogValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_service_is_active() {
        let s = ServiceCatalogEntry::new("Haircut", Price::from_cents(2500), None);
        assert!(s.is_active);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let s = ServiceCatalogEntry::new("  ", Price::zero(), None);
        assert_eq!(s.validate(), Err(CatalogValidationError::EmptyName));

        let c = Category::new("x".repeat(51));
        assert_eq!(c.validate(), Err(CatalogValidationError::NameTooLong(51)));
    }

    #[test]
    fn test_filter_all_matches_inactive() {
        let mut s = ServiceCatalogEntry::new("Old", Price::zero(), None);
        s.is_active = false;
        assert!(EntryFilter::all().matches(&s));
        assert!(!EntryFilter {
            is_active: Some(true),
            ..EntryFilter::all()
        }
        .matches(&s));
    }

    #[test]
    fn test_missing_active_flag_defaults_true() {
        let json = format!(
            r#"{{"id":"{}","name":"Wash","price":"5.00","updated_at":"2025-01-01T00:00:00Z"}}"#,
            uuid::Uuid::new_v4()
        );
        let s: ServiceCatalogEntry = serde_json::from_str(&json).unwrap();
        assert!(s.is_active);
        assert!(s.category_id.is_none());
    }
}
