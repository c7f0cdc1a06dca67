//! Error types for the Sheetload import pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ExtractError`] - Spreadsheet reading errors
//! - [`StoreError`] - Datastore errors
//! - [`ImportError`] - Fatal pipeline errors
//! - [`ConfigError`] - Environment configuration errors
//! - [`ServerError`] - HTTP server start-up errors
//!
//! Header rejections and row validation failures are not errors: they are
//! reported through [`crate::models::ImportOutcome`].

use thiserror::Error;

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors while reading cells out of an uploaded file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Failed to read the file from disk.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The payload is not a readable spreadsheet.
    #[error("Malformed spreadsheet file: {0}")]
    MalformedFile(String),

    /// The requested sheet does not exist.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
}

// =============================================================================
// Datastore Errors
// =============================================================================

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open the database.
    #[error("Failed to connect to database: {0}")]
    Connect(String),

    /// Failed to create the storage schema.
    #[error("Failed to prepare database schema: {0}")]
    Schema(String),

    /// A record does not satisfy the stored record schema.
    #[error("Record rejected by schema: {0:?}")]
    InvalidRecord(Vec<String>),

    /// Bulk insert failed.
    #[error("Failed to insert records: {0}")]
    Insert(String),

    /// Read query failed.
    #[error("Failed to query records: {0}")]
    Query(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Fatal import errors. Each aborts the import immediately.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file could not be read.
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Validated records could not be saved.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The parsing task was cancelled before it finished.
    #[error("Import worker stopped: {0}")]
    Worker(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Datastore could not be opened.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Socket bind or serve failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for datastore operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for pipeline operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
