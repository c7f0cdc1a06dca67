//! # Sheetload - Spreadsheet transaction import
//!
//! Sheetload reads transaction spreadsheets (xlsx, xls, ods, csv), validates
//! every row and persists the submission only when every row is valid.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Spreadsheet │────▶│   Parser    │────▶│   Headers   │────▶│    Rows     │────▶│   SQLite    │
//! │ (xlsx/csv)  │     │ (calamine)  │     │ (exact set) │     │ (4 rules)   │     │ (all/none)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetload::{run_import_file, ImportContext, LogBroadcaster, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let ctx = ImportContext::today();
//!     let outcome = run_import_file("october.xlsx".as_ref(), &ctx, &store, &LogBroadcaster::new())
//!         .await
//!         .unwrap();
//!     println!("{:?}", outcome);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (CellValue, ValidatedRecord, ImportOutcome)
//! - [`parser`] - Sheet extraction with format auto-detection
//! - [`validation`] - Header mapping, row rules, record schema
//! - [`import`] - Partitioning and the import pipeline
//! - [`store`] - Record persistence
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Pipeline
pub mod import;

// Persistence
pub mod store;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, ExtractError, ImportError, ServerError, StoreError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, Field, ImportOutcome, RawRow, RejectReason, RowError, ValidatedRecord};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    extract_sheet,
    extract_sheet_file,
    sheet_names,
    detect_encoding,
    detect_delimiter,
    decode_content,
    ExtractedSheet,
    SheetSelector,
    SourceFormat,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{map_headers, validate_record, validate_row, HeaderMap, HeaderPolicy};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use import::{
    evaluate,
    evaluate_sheet,
    group_by_sheet,
    partition,
    run_import,
    run_import_file,
    Evaluation,
    ImportContext,
    Partition,
    SheetErrors,
};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{MemoryStore, RecordStore, SqliteStore};

// =============================================================================
// Re-exports - Config & API
// =============================================================================

pub use config::AppConfig;
pub use api::logs::{LogBroadcaster, LogEntry, LogLevel};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
