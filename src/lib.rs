//! Price Ledger - bulk price changes with preview, audit journal, and undo
//!
//! This library applies percentage or fixed-amount price changes to many
//! catalog services at once. Every change is previewed before it is applied,
//! recorded in an append-only journal with a snapshot of the prices it
//! replaced, and can be reverted exactly, newest first.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (prices, change specifications, journal entries)
//! - `storage`: JSON catalog, hash-chained journal, and store transactions
//! - `services`: Preview, bulk update, revert, journal, and catalog logic
//! - `cli`: Command handlers for the `price-ledger` binary
//! - `display`: Terminal formatting
//! - `export`: JSON, YAML, and CSV export
//!
//! # Example
//!
//! ```rust,ignore
//! use price_ledger::config::paths::LedgerPaths;
//! use price_ledger::models::{Amount, ChangeKind, ChangeSpecification};
//! use price_ledger::services::{BulkUpdateService, PreviewService, RevertService};
//! use price_ledger::storage::Storage;
//!
//! let mut storage = Storage::new(LedgerPaths::new()?)?;
//! storage.load_all()?;
//!
//! let spec = ChangeSpecification::new(ChangeKind::Increase, Amount::parse("10")?, true);
//! let preview = PreviewService::new(&storage).compute_preview(&spec)?;
//! let entry = BulkUpdateService::new(&storage).apply(&spec)?;
//! RevertService::new(&storage).revert(entry.id)?;
//! ```

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
