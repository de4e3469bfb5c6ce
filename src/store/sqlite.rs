//! SQLite-backed [`DocumentStore`].
//!
//! Each record is serialized to JSON and kept in a single `documents` table
//! keyed by a UUID, with the collection name as a column. The schema is
//! created on connect.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::migrate;
use crate::models::UploadRecord;

use super::{DocumentStore, StoreError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database named by a `sqlite:` URI.
    pub async fn connect(uri: &str, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = database_path(uri).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Connect(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(uri)
            .map_err(|e| StoreError::Connect(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        migrate::run_migrations(&pool)
            .await
            .map_err(|e| StoreError::Connect(format!("schema setup failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Number of documents stored in `collection`.
    pub async fn count(&self, collection: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))
    }

    /// Loads every record in `collection`, oldest first.
    pub async fn records(&self, collection: &str) -> Result<Vec<UploadRecord>, StoreError> {
        let bodies: Vec<String> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Connect(e.to_string()))?;

        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(|e| StoreError::Connect(e.to_string())))
            .collect()
    }
}

/// Extracts the filesystem path from a `sqlite:` URI, if it names one.
fn database_path(uri: &str) -> Option<&Path> {
    let rest = uri.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connect(e.to_string()))
    }

    async fn insert(&self, collection: &str, record: &UploadRecord) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::to_string(&record.clone().with_id(id.clone()))
            .map_err(|e| StoreError::Insert(e.to_string()))?;

        sqlx::query("INSERT INTO documents (id, collection, body, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(collection)
            .bind(&body)
            .bind(record.upload_time.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Insert(e.to_string()))?;

        Ok(id)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
