//! Record store - persistence of validated transactions.
//!
//! The pipeline only talks to the [`RecordStore`] trait. Two implementations:
//!
//! - [`SqliteStore`] - SQLite database through a sqlx connection pool
//! - [`MemoryStore`] - In-process vector, for dry runs and tests
//!
//! Every implementation checks the batch against the transaction schema before
//! writing anything, and writes one submission as a single batch.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::ValidatedRecord;
use crate::validation::validate_record;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Destination for validated transaction batches.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one submission. Returns the number of records saved.
    async fn insert_many(&self, import_id: Uuid, records: &[ValidatedRecord]) -> StoreResult<usize>;

    /// Number of records stored.
    async fn count(&self) -> StoreResult<usize>;
}

/// Schema-check a batch before it is written.
pub(crate) fn check_batch(records: &[ValidatedRecord]) -> StoreResult<()> {
    let errors: Vec<String> = records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            validate_record(record)
                .err()
                .map(|errs| format!("record {}: {}", i, errs.join("; ")))
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::InvalidRecord(errors))
    }
}
