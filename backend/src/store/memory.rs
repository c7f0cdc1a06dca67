//! In-memory record store.

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{check_batch, RecordStore};
use crate::error::StoreResult;
use crate::models::ValidatedRecord;

/// Keeps records in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<(Uuid, ValidatedRecord)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored records, in insertion order.
    pub async fn records(&self) -> Vec<ValidatedRecord> {
        self.records
            .lock()
            .await
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_many(&self, import_id: Uuid, records: &[ValidatedRecord]) -> StoreResult<usize> {
        check_batch(records)?;

        let mut stored = self.records.lock().await;
        stored.extend(records.iter().cloned().map(|r| (import_id, r)));
        Ok(records.len())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.records.lock().await.len())
    }
}
