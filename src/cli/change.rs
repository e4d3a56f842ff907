//! Preview and apply CLI commands
//!
//! Both commands share the same change arguments, so a preview can be turned
//! into an apply by changing only the verb.

use std::io::Write;

use clap::{ArgGroup, Args};

use crate::config::settings::Settings;
use crate::display::format_preview;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Amount, ChangeKind, ChangeSpecification};
use crate::services::{BulkUpdateService, CatalogService, PreviewService};
use crate::storage::Storage;

/// Arguments describing a bulk price change
#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("direction").required(true).args(["increase", "decrease"])))]
pub struct ChangeArgs {
    /// Raise prices by this amount
    #[arg(long, value_name = "AMOUNT", allow_hyphen_values = true)]
    pub increase: Option<String>,

    /// Lower prices by this amount
    #[arg(long, value_name = "AMOUNT", allow_hyphen_values = true)]
    pub decrease: Option<String>,

    /// Treat the amount as a percentage of each price
    #[arg(short, long)]
    pub percent: bool,

    /// Restrict the change to one category (name or ID)
    #[arg(short, long)]
    pub category: Option<String>,
}

impl ChangeArgs {
    /// Build a validated change specification and its human-readable scope
    pub fn to_spec(&self, storage: &Storage) -> LedgerResult<(ChangeSpecification, String)> {
        let (kind, raw) = match (&self.increase, &self.decrease) {
            (Some(amount), None) => (ChangeKind::Increase, amount),
            (None, Some(amount)) => (ChangeKind::Decrease, amount),
            _ => {
                return Err(LedgerError::Validation(
                    "Specify exactly one of --increase or --decrease".into(),
                ))
            }
        };

        let amount = Amount::parse(raw)
            .map_err(|e| LedgerError::Validation(format!("Invalid amount '{}': {}", raw, e)))?;
        let is_percentage = self.percent || raw.trim().ends_with('%');
        let mut spec = ChangeSpecification::new(kind, amount, is_percentage);

        let scope = match &self.category {
            Some(identifier) => {
                let category = CatalogService::new(storage).resolve_category(identifier)?;
                spec = spec.in_category(category.id);
                format!("category '{}'", category.name)
            }
            None => "all categories".to_string(),
        };

        Ok((spec, scope))
    }
}

/// Handle the preview command
pub fn handle_preview_command(
    storage: &Storage,
    settings: &Settings,
    args: ChangeArgs,
    details: bool,
) -> LedgerResult<()> {
    let (spec, scope) = args.to_spec(storage)?;
    let preview = PreviewService::new(storage).compute_preview(&spec)?;

    print!(
        "{}",
        format_preview(&spec, &scope, &preview, details, &settings.currency_symbol)
    );
    Ok(())
}

/// Handle the apply command
///
/// When `require_preview` is set the preview is shown first and the operator
/// must confirm, unless `yes` was given.
pub fn handle_apply_command(
    storage: &Storage,
    settings: &Settings,
    args: ChangeArgs,
    yes: bool,
) -> LedgerResult<()> {
    let (spec, scope) = args.to_spec(storage)?;

    if settings.require_preview && !yes {
        let preview = PreviewService::new(storage).compute_preview(&spec)?;
        print!(
            "{}",
            format_preview(&spec, &scope, &preview, true, &settings.currency_symbol)
        );
        if preview.affected_count == 0 {
            return Err(LedgerError::NoMatchingServices { scope });
        }

        print!("Apply this change? (yes/no): ");
        std::io::stdout().flush()?;

        let mut confirm = String::new();
        std::io::stdin().read_line(&mut confirm)?;

        if !matches!(confirm.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted. No prices were changed.");
            return Ok(());
        }
    }

    let entry = BulkUpdateService::new(storage).apply(&spec)?;

    println!(
        "Applied {} to {} services on {}",
        entry.describe_change(),
        entry.affected_count,
        entry.scope()
    );
    println!("  Journal entry: {}", entry.id);
    println!("  Undo with: price-ledger revert {}", entry.id);
    Ok(())
}

