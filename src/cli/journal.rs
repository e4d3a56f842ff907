//! Journal and revert CLI commands
//!
//! Listing and inspecting the price journal, verifying its hash chain, and
//! reverting an applied change.

use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::{format_change_rows, format_journal_details, format_journal_list};
use crate::error::{LedgerError, LedgerResult};
use crate::models::EntryFilter;
use crate::services::{JournalService, PlannedChange, RevertService};
use crate::storage::Storage;

/// Journal subcommands
#[derive(Subcommand)]
pub enum JournalCommands {
    /// List journal entries, newest first
    List {
        /// Number of entries to show (defaults to the configured page size)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one entry with its price snapshot and revert eligibility
    Show {
        /// Journal entry ID (full or short form)
        id: String,
    },

    /// Check the journal's hash chain
    Verify,
}

/// Handle a journal command
pub fn handle_journal_command(
    storage: &Storage,
    settings: &Settings,
    cmd: JournalCommands,
) -> LedgerResult<()> {
    let service = JournalService::new(storage);

    match cmd {
        JournalCommands::List { limit } => {
            let limit = limit.unwrap_or(settings.journal_page_size);
            let entries = service.list(Some(limit))?;
            print!("{}", format_journal_list(&entries, &settings.date_format));

            let total = service.count()?;
            if total > entries.len() {
                println!(
                    "\nShowing {} of {} entries. Use --limit to see more.",
                    entries.len(),
                    total
                );
            }
        }

        JournalCommands::Show { id } => {
            let entry = service
                .find(&id)?
                .ok_or_else(|| LedgerError::journal_entry_not_found(&id))?;
            let eligibility = service.eligibility(&entry)?;
            let services = storage.catalog.list_entries(&EntryFilter::all())?;

            print!(
                "{}",
                format_journal_details(
                    &entry,
                    &eligibility,
                    &services,
                    &settings.date_format,
                    &settings.currency_symbol
                )
            );
        }

        JournalCommands::Verify => {
            let records = service.verify()?;
            println!(
                "Journal OK: {} records, {} entries, hash chain intact",
                records,
                service.count()?
            );
        }
    }

    Ok(())
}

/// Handle the revert command
pub fn handle_revert_command(storage: &Storage, settings: &Settings, id: &str) -> LedgerResult<()> {
    let entry_id = JournalService::new(storage).resolve(id)?;
    let counter = RevertService::new(storage).revert(entry_id)?;

    println!(
        "Reverted {}: restored {} services",
        entry_id, counter.affected_count
    );
    println!("  Revert entry: {}", counter.id);

    let mut rows = Vec::with_capacity(counter.old_prices.len());
    for (service_id, overwritten) in &counter.old_prices {
        if let Some(service) = storage.catalog.get_entry(*service_id)? {
            rows.push(PlannedChange {
                service_id: *service_id,
                name: service.name,
                old_price: *overwritten,
                new_price: service.price,
            });
        }
    }
    print!("{}", format_change_rows(&rows, &settings.currency_symbol));

    Ok(())
}
