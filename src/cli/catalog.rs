//! Catalog CLI commands
//!
//! Listing the service catalog and importing it from CSV.

use std::path::PathBuf;

use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::format_catalog_list;
use crate::error::{LedgerError, LedgerResult};
use crate::models::EntryFilter;
use crate::services::CatalogService;
use crate::storage::Storage;

/// Catalog subcommands
#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List services in the catalog
    List {
        /// Only show services in this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,
        /// Include inactive services
        #[arg(short, long)]
        all: bool,
    },

    /// Import services from a CSV file (columns: name,price,category,active)
    Import {
        /// Path to CSV file
        file: PathBuf,
    },
}

/// Handle a catalog command
pub fn handle_catalog_command(
    storage: &Storage,
    settings: &Settings,
    cmd: CatalogCommands,
) -> LedgerResult<()> {
    let service = CatalogService::new(storage);

    match cmd {
        CatalogCommands::List { category, all } => {
            let category_id = match category {
                Some(identifier) => Some(service.resolve_category(&identifier)?.id),
                None => None,
            };
            let filter = EntryFilter {
                category_id,
                is_active: if all { None } else { Some(true) },
            };

            let services = service.list_entries(&filter)?;
            let categories = service.list_categories()?;
            print!(
                "{}",
                format_catalog_list(&services, &categories, &settings.currency_symbol)
            );
        }

        CatalogCommands::Import { file } => {
            if !file.exists() {
                return Err(LedgerError::Import(format!(
                    "File not found: {}",
                    file.display()
                )));
            }

            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_path(&file)
                .map_err(|e| LedgerError::Import(format!("Failed to read file: {}", e)))?;

            let summary = service.import_csv(&mut reader)?;

            println!("Imported catalog from {}", file.display());
            println!("  Services created:   {}", summary.services_created);
            println!("  Services updated:   {}", summary.services_updated);
            println!("  Categories created: {}", summary.categories_created);
        }
    }

    Ok(())
}
