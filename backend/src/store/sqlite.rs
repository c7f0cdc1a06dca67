//! SQLite record store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use super::{check_batch, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::models::ValidatedRecord;

const TRANSACTIONS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    import_id TEXT NOT NULL,
    name TEXT NOT NULL CHECK (length(name) > 0),
    amount REAL NOT NULL CHECK (amount > 0),
    date TEXT NOT NULL,
    verified BOOLEAN NOT NULL,
    created_at DATETIME NOT NULL
)";

/// Transactions table in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `database_url` and
    /// prepare the `transactions` table.
    ///
    /// `sqlite::memory:` gives a private database that lives as long as the
    /// store.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Connect(format!("Failed to parse connection string: {}", e)))?
            .create_if_missing(true);

        // Every pooled connection to :memory: would open its own database.
        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        sqlx::query(TRANSACTIONS_SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_many(&self, import_id: Uuid, records: &[ValidatedRecord]) -> StoreResult<usize> {
        check_batch(records)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Insert(e.to_string()))?;

        let created_at = Utc::now();
        for record in records {
            sqlx::query(
                "INSERT INTO transactions (id, import_id, name, amount, date, verified, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(import_id.to_string())
            .bind(record.name())
            .bind(record.amount())
            .bind(record.date())
            .bind(record.verified())
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Insert(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Insert(e.to_string()))?;

        Ok(records.len())
    }

    async fn count(&self) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(count as usize)
    }
}
