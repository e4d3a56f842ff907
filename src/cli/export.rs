//! CLI command for ledger export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::ValueEnum;

use crate::config::paths::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::export::{csv, json, yaml};
use crate::storage::Storage;

/// Export format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    /// JSON format (catalog and journal)
    Json,
    /// YAML format (catalog and journal, human-readable)
    Yaml,
    /// CSV format (journal only)
    Csv,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Handle the export command
///
/// Without `--output` the file lands in the exports directory, named by
/// the current timestamp.
pub fn handle_export_command(
    storage: &Storage,
    paths: &LedgerPaths,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> LedgerResult<()> {
    let output = match output {
        Some(path) => path,
        None => paths.export_dir().join(format!(
            "ledger-{}.{}",
            chrono::Utc::now().format("%Y%m%d-%H%M%S"),
            format.extension()
        )),
    };

    let file = File::create(&output).map_err(|e| {
        LedgerError::Export(format!("Failed to create file {}: {}", output.display(), e))
    })?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Json => {
            json::export_full_json(storage, &mut writer, true)?;
            println!("Ledger exported to: {}", output.display());
        }
        ExportFormat::Yaml => {
            yaml::export_full_yaml(storage, &mut writer)?;
            println!("Ledger exported to: {}", output.display());
        }
        ExportFormat::Csv => {
            let count = csv::export_journal_csv(storage, &mut writer)?;
            println!("Exported {} journal entries to: {}", count, output.display());
        }
    }

    writer
        .flush()
        .map_err(|e| LedgerError::Export(e.to_string()))?;
    Ok(())
}
