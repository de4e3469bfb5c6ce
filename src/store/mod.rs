//! Document store abstraction.
//!
//! The [`DocumentStore`] trait is the only thing the upload path knows about
//! persistence. Backends are selected by the connection string's scheme:
//!
//! | Scheme | Backend |
//! |--------|---------|
//! | `mongodb://`, `mongodb+srv://` | [`mongo::MongoStore`] |
//! | `sqlite:` | [`sqlite::SqliteStore`] |
//! | `memory:` | [`memory::InMemoryStore`] |
//!
//! Connection lifecycle (connect once vs. connect per request) is handled by
//! [`pool::StorePool`], not by the backends.

pub mod memory;
pub mod mongo;
pub mod pool;
pub mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::models::UploadRecord;

/// Errors raised by document store backends and the store pool.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The pool has no usable connection yet.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("unsupported store URI scheme: '{0}' (expected mongodb://, mongodb+srv://, sqlite: or memory:)")]
    UnsupportedUri(String),
    #[error("failed to connect to document store: {0}")]
    Connect(String),
    #[error("failed to insert document: {0}")]
    Insert(String),
}

/// A schema-flexible store of upload records grouped into named collections.
///
/// Implementations must be `Send + Sync`; one handle may serve many
/// concurrent requests under the shared lifecycle.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs (`"mongodb"`, `"sqlite"`, `"memory"`).
    fn backend(&self) -> &'static str;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Inserts one record into `collection` and returns the assigned id.
    async fn insert(&self, collection: &str, record: &UploadRecord) -> Result<String, StoreError>;

    /// Releases the underlying connection. The handle must not be used afterwards.
    async fn close(&self) {}
}

/// Settings needed to open a backend connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub uri: String,
    pub database: String,
    pub connect_timeout: Duration,
}

impl ConnectOptions {
    /// Reads `[store]` settings. Fails if no URI is configured.
    pub fn from_config(config: &StoreConfig) -> anyhow::Result<Self> {
        let uri = config.uri.clone().ok_or_else(|| {
            anyhow::anyhow!("store.uri is not set (set MONGODB_URI or [store].uri)")
        })?;
        Ok(Self {
            uri,
            database: config.database.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        })
    }
}

/// Opens a store for `options.uri`, dispatching on its scheme.
///
/// A successful return means the backend answered a ping.
pub async fn open(options: &ConnectOptions) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let uri = options.uri.trim();
    let store: Arc<dyn DocumentStore> =
        if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            Arc::new(mongo::MongoStore::connect(uri, &options.database, options.connect_timeout).await?)
        } else if uri.starts_with("sqlite:") {
            Arc::new(sqlite::SqliteStore::connect(uri, options.connect_timeout).await?)
        } else if uri.starts_with("memory:") {
            Arc::new(memory::InMemoryStore::new())
        } else {
            let scheme = uri.split(':').next().unwrap_or(uri);
            return Err(StoreError::UnsupportedUri(scheme.to_string()));
        };

    store.ping().await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(uri: &str) -> ConnectOptions {
        ConnectOptions {
            uri: uri.to_string(),
            database: "docdrop".to_string(),
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_open_memory() {
        let store = open(&options("memory:")).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_open_unknown_scheme() {
        let err = open(&options("postgres://localhost/db")).await.err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedUri(ref s) if s == "postgres"));
    }

    #[tokio::test]
    async fn test_open_sqlite_creates_database() {
        let tmp = tempfile::TempDir::new().unwrap();
        let uri = format!("sqlite:{}", tmp.path().join("data/docdrop.sqlite").display());
        let store = open(&options(&uri)).await.unwrap();
        assert_eq!(store.backend(), "sqlite");
        store.close().await;
    }
}
