//! Preview display formatting

use crate::models::ChangeSpecification;
use crate::services::{PlannedChange, PreviewResult};

/// Format a preview summary, optionally followed by per-service rows
pub fn format_preview(
    spec: &ChangeSpecification,
    scope: &str,
    preview: &PreviewResult,
    details: bool,
    currency_symbol: &str,
) -> String {
    let mut output = String::new();
    output.push_str(&format!("Preview: {} on {}\n", spec.describe(), scope));
    output.push_str(&format!("  Services affected: {}\n", preview.affected_count));

    if preview.affected_count == 0 {
        output.push_str("  Nothing to change.\n");
        return output;
    }

    output.push_str(&format!(
        "  Current prices:    {} - {}\n",
        preview.current_price_range.min.format_with_symbol(currency_symbol),
        preview.current_price_range.max.format_with_symbol(currency_symbol),
    ));
    output.push_str(&format!(
        "  New prices:        {} - {}\n",
        preview.new_price_range.min.format_with_symbol(currency_symbol),
        preview.new_price_range.max.format_with_symbol(currency_symbol),
    ));

    if details {
        output.push('\n');
        output.push_str(&format_change_rows(&preview.changes, currency_symbol));
    }

    output
}

/// Format `service  old -> new` rows
pub fn format_change_rows(changes: &[PlannedChange], currency_symbol: &str) -> String {
    let name_width = changes.iter().map(|c| c.name.len()).max().unwrap_or(7).max(7);

    let mut output = String::new();
    output.push_str(&format!(
        "  {:<name_width$}  {:>12}     {:>12}\n",
        "Service",
        "Old",
        "New",
        name_width = name_width
    ));
    for change in changes {
        output.push_str(&format!(
            "  {:<name_width$}  {:>12}  -> {:>12}\n",
            change.name,
            change.old_price.format_with_symbol(currency_symbol),
            change.new_price.format_with_symbol(currency_symbol),
            name_width = name_width
        ));
    }
    output
}
