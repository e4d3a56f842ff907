//! Journal display formatting
//!
//! Formats journal entries for terminal output in list and detail views.

use std::collections::HashMap;

use crate::models::{JournalEntry, ServiceCatalogEntry, ServiceId};
use crate::services::RevertEligibility;

/// Format journal entries as a table, newest first
pub fn format_journal_list(entries: &[JournalEntry], date_format: &str) -> String {
    if entries.is_empty() {
        return "No journal entries found.".to_string();
    }

    let scope_width = entries
        .iter()
        .map(|e| e.scope().len())
        .max()
        .unwrap_or(5)
        .max(5);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<16}  {:<7}  {:>10}  {:<scope_width$}  {:>8}  {}\n",
        "ID",
        "Created",
        "Kind",
        "Change",
        "Scope",
        "Services",
        "Status",
        scope_width = scope_width,
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<16}  {:-<7}  {:->10}  {:-<scope_width$}  {:->8}  {:-<8}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        scope_width = scope_width,
    ));

    for entry in entries {
        output.push_str(&format!(
            "{:<12}  {:<16}  {:<7}  {:>10}  {:<scope_width$}  {:>8}  {}\n",
            entry.id.to_string(),
            entry.created_at.format(date_format).to_string(),
            entry.record_kind.to_string(),
            entry.describe_change(),
            entry.scope(),
            entry.affected_count,
            status_label(entry),
            scope_width = scope_width,
        ));
    }

    output
}

fn status_label(entry: &JournalEntry) -> String {
    match (entry.reverts, entry.is_reverted) {
        (Some(source), _) => format!("reverts {}", source),
        (None, true) => "Reverted".to_string(),
        (None, false) => "In effect".to_string(),
    }
}

/// Format a single entry with its price snapshot and revert eligibility
pub fn format_journal_details(
    entry: &JournalEntry,
    eligibility: &RevertEligibility,
    services: &[ServiceCatalogEntry],
    date_format: &str,
    currency_symbol: &str,
) -> String {
    let names: HashMap<ServiceId, &str> =
        services.iter().map(|s| (s.id, s.name.as_str())).collect();

    let mut output = String::new();
    output.push_str(&format!("Journal entry: {}\n", entry.id));
    output.push_str(&format!("  Full ID:  {}\n", entry.id.as_uuid()));
    output.push_str(&format!("  Kind:     {}\n", entry.record_kind));
    output.push_str(&format!("  Change:   {}\n", entry.describe_change()));
    output.push_str(&format!("  Scope:    {}\n", entry.scope()));
    output.push_str(&format!(
        "  Created:  {} (#{})\n",
        entry.created_at.format(date_format),
        entry.sequence
    ));
    if let Some(source) = entry.reverts {
        output.push_str(&format!("  Reverts:  {}\n", source));
    }
    if let Some(at) = entry.reverted_at {
        output.push_str(&format!("  Reverted: {}\n", at.format(date_format)));
    }

    output.push_str(&format!("\n  Revert:   {}\n", eligibility_label(eligibility)));

    let label = if entry.is_revert() {
        "Prices overwritten by this revert"
    } else {
        "Prices before this change"
    };
    output.push_str(&format!("\n{} ({}):\n", label, entry.affected_count));
    for (service_id, price) in &entry.old_prices {
        let name = names.get(service_id).copied().unwrap_or("(removed)");
        output.push_str(&format!(
            "  {:<12}  {:<24}  {:>12}\n",
            service_id.to_string(),
            name,
            price.format_with_symbol(currency_symbol)
        ));
    }

    output
}

fn eligibility_label(eligibility: &RevertEligibility) -> String {
    match eligibility {
        RevertEligibility::Eligible => "eligible".to_string(),
        RevertEligibility::IsRevert => "not allowed (revert entries are terminal)".to_string(),
        RevertEligibility::AlreadyReverted(_) => "already reverted".to_string(),
        RevertEligibility::Blocked(blocking) => format!(
            "blocked by newer changes: {}",
            blocking
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
