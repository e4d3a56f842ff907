use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use price_ledger::cli::{
    handle_apply_command, handle_catalog_command, handle_export_command, handle_journal_command,
    handle_preview_command, handle_revert_command, CatalogCommands, ChangeArgs, ExportFormat,
    JournalCommands,
};
use price_ledger::config::{paths::LedgerPaths, settings::Settings};
use price_ledger::storage::Storage;
use price_ledger::LedgerError;

#[derive(Parser)]
#[command(
    name = "price-ledger",
    version,
    about = "Bulk price changes for a service catalog",
    long_about = "Price Ledger applies percentage or fixed-amount price changes to \
                  many catalog services at once. Every change can be previewed first, \
                  is recorded in an append-only journal, and can be reverted exactly, \
                  newest first."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger
    Init,

    /// Show current configuration and paths
    Config,

    /// Service catalog commands
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Show what a bulk change would do without applying it
    Preview {
        #[command(flatten)]
        change: ChangeArgs,
        /// List every affected service with its old and new price
        #[arg(short, long)]
        details: bool,
    },

    /// Apply a bulk change and record it in the journal
    Apply {
        #[command(flatten)]
        change: ChangeArgs,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Price journal commands
    #[command(subcommand)]
    Journal(JournalCommands),

    /// Revert an applied change
    Revert {
        /// Journal entry ID (full or short form)
        id: String,
    },

    /// Export the catalog and journal
    Export {
        /// Export format
        #[arg(value_enum)]
        format: ExportFormat,
        /// Output file path (defaults to the exports directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<LedgerError>() {
                Some(ledger_err) => eprintln!("Error [{}]: {}", ledger_err.kind(), ledger_err),
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    price_ledger::logging::init(&settings.log_level, cli.verbose);

    // Initialize storage
    let mut storage = Storage::new(paths.clone())?;
    storage
        .load_all()
        .with_context(|| format!("Failed to load ledger from {}", paths.data_dir().display()))?;

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing price ledger at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            let _guard = storage.lock_mutations()?;
            storage.catalog.save()?;
            println!("Initialization complete!");
            println!();
            println!("Next, load your services:");
            println!("  price-ledger catalog import services.csv");
        }
        Some(Commands::Config) => {
            println!("Price Ledger Configuration");
            println!("==========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Catalog file:     {}", paths.catalog_file().display());
            println!("Journal file:     {}", paths.journal_file().display());
            println!("Export directory: {}", paths.export_dir().display());
            println!("Initialized:      {}", storage.is_initialized());
            println!();
            println!("Settings:");
            println!("  Currency symbol:   {}", settings.currency_symbol);
            println!("  Date format:       {}", settings.date_format);
            println!("  Log level:         {}", settings.log_level);
            println!("  Journal page size: {}", settings.journal_page_size);
            println!("  Require preview:   {}", settings.require_preview);
        }
        Some(Commands::Catalog(cmd)) => {
            handle_catalog_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Preview { change, details }) => {
            handle_preview_command(&storage, &settings, change, details)?;
        }
        Some(Commands::Apply { change, yes }) => {
            handle_apply_command(&storage, &settings, change, yes)?;
        }
        Some(Commands::Journal(cmd)) => {
            handle_journal_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Revert { id }) => {
            handle_revert_command(&storage, &settings, &id)?;
        }
        Some(Commands::Export { format, output }) => {
            handle_export_command(&storage, &paths, format, output)?;
        }
        None => {
            println!("Price Ledger - bulk price changes with preview and undo");
            println!();
            println!("Run 'price-ledger --help' for usage information.");
        }
    }

    Ok(())
}
