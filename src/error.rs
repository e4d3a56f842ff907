//! Custom error types for the price ledger
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Every ledger failure carries a stable
//! kind string so callers can surface it verbatim.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::JournalEntryId;

/// The main error type for price ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Malformed change specification or price
    #[error("Validation error: {0}")]
    Validation(String),

    /// The change specification selects no active service
    #[error("No active services match {scope}")]
    NoMatchingServices { scope: String },

    /// The store failed mid-transaction; nothing was changed
    #[error("Transaction aborted, no changes were made: {0}")]
    TransactionAborted(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// The journal entry has already been reverted
    #[error("Journal entry {id} was already reverted at {reverted_at}")]
    AlreadyReverted {
        id: JournalEntryId,
        reverted_at: DateTime<Utc>,
    },

    /// Revert entries are terminal
    #[error("Journal entry {0} is a revert and cannot itself be reverted")]
    RevertOfRevertNotAllowed(JournalEntryId),

    /// Newer changes must be reverted first
    #[error("Journal entry {id} cannot be reverted before newer changes: {}", format_ids(.blocking))]
    OutOfOrderRevert {
        id: JournalEntryId,
        blocking: Vec<JournalEntryId>,
    },

    /// Journal file failed its hash chain check
    #[error("Journal integrity error: {0}")]
    Integrity(String),

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

fn format_ids(ids: &[JournalEntryId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl LedgerError {
    /// Create a "not found" error for catalog services
    pub fn service_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Service",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for journal entries
    pub fn journal_entry_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Journal entry",
            identifier: identifier.into(),
        }
    }

    /// Stable, transport-independent name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::Validation(_) => "ValidationError",
            Self::NoMatchingServices { .. } => "NoMatchingServices",
            Self::TransactionAborted(_) => "TransactionAborted",
            Self::NotFound { .. } => "NotFound",
            Self::AlreadyReverted { .. } => "AlreadyReverted",
            Self::RevertOfRevertNotAllowed(_) => "RevertOfRevertNotAllowed",
            Self::OutOfOrderRevert { .. } => "OutOfOrderRevert",
            Self::Integrity(_) => "IntegrityError",
            Self::Import(_) => "ImportError",
            Self::Export(_) => "ExportError",
            Self::Storage(_) => "StorageError",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the caller may safely resubmit the same call unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionAborted(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for price ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
