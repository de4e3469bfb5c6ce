//! MongoDB-backed [`DocumentStore`] using the official `mongodb` driver.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

use crate::models::UploadRecord;

use super::{DocumentStore, StoreError};

pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Creates a client for `uri`.
    ///
    /// The database named in the URI path wins over `database`. The driver
    /// connects lazily, so reachability is only known after [`ping`](DocumentStore::ping).
    pub async fn connect(uri: &str, database: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        options.app_name = Some("docdrop".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(|e| StoreError::Connect(e.to_string()))?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(database));

        Ok(Self { client, db })
    }
}

/// Converts a record into the BSON document written to the collection.
///
/// `uploadTime` is stored as a native BSON date, not a string.
fn to_document(record: &UploadRecord) -> Document {
    doc! {
        "filename": record.filename.clone(),
        "mimetype": record.mimetype.clone(),
        "size": record.size as i64,
        "uploadTime": BsonDateTime::from_millis(record.upload_time.timestamp_millis()),
    }
}

fn id_to_string(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connect(e.to_string()))
    }

    async fn insert(&self, collection: &str, record: &UploadRecord) -> Result<String, StoreError> {
        let result = self
            .db
            .collection::<Document>(collection)
            .insert_one(to_document(record))
            .await
            .map_err(|e| StoreError::Insert(e.to_string()))?;
        Ok(id_to_string(result.inserted_id))
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_document_shape() {
        let record = UploadRecord {
            id: None,
            filename: Some("a.png".to_string()),
            mimetype: None,
            size: 42,
            upload_time: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        };
        let doc = to_document(&record);
        assert_eq!(doc.get_str("filename").unwrap(), "a.png");
        assert_eq!(doc.get("mimetype"), Some(&Bson::Null));
        assert_eq!(doc.get_i64("size").unwrap(), 42);
        assert_eq!(
            doc.get_datetime("uploadTime").unwrap().timestamp_millis(),
            record.upload_time.timestamp_millis()
        );
        assert!(doc.get("_id").is_none());
    }

    #[test]
    fn test_object_id_rendered_as_hex() {
        let oid = ObjectId::new();
        assert_eq!(id_to_string(Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(id_to_string(Bson::String("custom".into())), "custom");
    }
}
