//! Core data models used throughout docdrop.
//!
//! [`UploadRecord`] is the only persisted entity: one document per accepted
//! upload, written once and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata document stored for one accepted file upload.
///
/// Serialized with the wire names used by the HTTP API and the document
/// store (`filename`, `mimetype`, `size`, `uploadTime`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Store-assigned identifier, filled in after insertion.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Client-supplied file name, `None` if the client sent none.
    pub filename: Option<String>,
    /// Client-reported content type.
    pub mimetype: Option<String>,
    /// Byte length of the uploaded content (`0` when no file was sent).
    pub size: u64,
    /// Server-assigned insertion timestamp.
    #[serde(rename = "uploadTime")]
    pub upload_time: DateTime<Utc>,
}

/// A file read from a multipart request body, held in memory.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: Option<String>,
    pub mimetype: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadRecord {
    /// Builds the record for an uploaded file, stamped with `now`.
    pub fn from_file(file: &IncomingFile, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            filename: file.filename.clone(),
            mimetype: file.mimetype.clone(),
            size: file.bytes.len() as u64,
            upload_time: now,
        }
    }

    /// Builds the placeholder record written when a request carried no file.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            filename: None,
            mimetype: None,
            size: 0,
            upload_time: now,
        }
    }

    /// Returns a copy carrying the store-assigned id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_is_byte_length() {
        let file = IncomingFile {
            filename: Some("notes.txt".to_string()),
            mimetype: Some("text/plain".to_string()),
            bytes: "héllo".as_bytes().to_vec(),
        };
        let record = UploadRecord::from_file(&file, Utc::now());
        assert_eq!(record.size, 6);
        assert_eq!(record.filename.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_wire_names() {
        let record = UploadRecord::empty(Utc::now()).with_id("abc");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_id"], "abc");
        assert!(json["filename"].is_null());
        assert!(json["mimetype"].is_null());
        assert_eq!(json["size"], 0);
        assert!(json["uploadTime"].is_string());
    }

    #[test]
    fn test_id_omitted_before_insert() {
        let record = UploadRecord::empty(Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("_id").is_none());
    }
}
