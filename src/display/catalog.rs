//! Catalog display formatting
//!
//! Formats catalog services and categories for terminal output.

use std::collections::HashMap;

use crate::models::{Category, CategoryId, ServiceCatalogEntry};

/// Format services as a table with their category and status
pub fn format_catalog_list(
    services: &[ServiceCatalogEntry],
    categories: &[Category],
    currency_symbol: &str,
) -> String {
    if services.is_empty() {
        return "No services found.\n\nRun 'price-ledger catalog import <file.csv>' to load a catalog."
            .to_string();
    }

    let category_names: HashMap<CategoryId, &str> =
        categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    let category_of = |s: &ServiceCatalogEntry| -> String {
        s.category_id
            .map(|id| category_names.get(&id).copied().unwrap_or("Unknown").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    let name_width = services.iter().map(|s| s.name.len()).max().unwrap_or(4).max(4);
    let category_width = services
        .iter()
        .map(|s| category_of(s).len())
        .max()
        .unwrap_or(8)
        .max(8);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<name_width$}  {:<category_width$}  {:>12}  {}\n",
        "ID",
        "Name",
        "Category",
        "Price",
        "Status",
        name_width = name_width,
        category_width = category_width,
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<name_width$}  {:-<category_width$}  {:->12}  {:-<8}\n",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
        category_width = category_width,
    ));

    for service in services {
        let status = if service.is_active { "Active" } else { "Inactive" };
        output.push_str(&format!(
            "{:<12}  {:<name_width$}  {:<category_width$}  {:>12}  {}\n",
            service.id.to_string(),
            service.name,
            category_of(service),
            service.price.format_with_symbol(currency_symbol),
            status,
            name_width = name_width,
            category_width = category_width,
        ));
    }

    output.push_str(&format!("\n{} services\n", services.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Price;

    #[test]
    fn test_empty_catalog() {
        assert!(format_catalog_list(&[], &[], "$").contains("No services found"));
    }

    #[test]
    fn test_catalog_table() {
        let hair = Category::new("Hair");
        let cut = ServiceCatalogEntry::new("Cut", Price::from_cents(3000), Some(hair.id));
        let mut perm = ServiceCatalogEntry::new("Perm", Price::from_cents(9550), None);
        perm.is_active = false;

        let text = format_catalog_list(&[cut, perm], &[hair], "$");
        assert!(text.contains("Hair"));
        assert!(text.contains("$30.00"));
        assert!(text.contains("$95.50"));
        assert!(text.contains("Inactive"));
        assert!(text.contains("2 services"));
    }
}
