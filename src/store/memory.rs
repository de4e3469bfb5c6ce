//! In-memory [`DocumentStore`] for development and tests.
//!
//! Records live in a `HashMap` of collections behind `std::sync::RwLock`.
//! Nothing survives the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::UploadRecord;

use super::{DocumentStore, StoreError};

/// In-memory store keyed by collection name.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<UploadRecord>>>,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a snapshot of the records in `collection`, in insertion order.
    pub fn records(&self, collection: &str) -> Vec<UploadRecord> {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of records across all collections.
    pub fn len(&self) -> usize {
        self.collections.read().unwrap().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Connect("store is closed".to_string()));
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, record: &UploadRecord) -> Result<String, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Insert("store is closed".to_string()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let mut collections = self.collections.write().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone().with_id(id.clone()));
        Ok(id)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
