//! Record-insertion routine for accepted uploads.
//!
//! Turns an optional in-memory file into an [`UploadRecord`] according to the
//! configured [`MissingFilePolicy`] and writes it through a store lease.
//! Exactly one document is inserted per `Ok` return; none on `Err`.

use chrono::{DateTime, Utc};

use crate::config::MissingFilePolicy;
use crate::models::{IncomingFile, UploadRecord};
use crate::store::pool::StorePool;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file uploaded")]
    MissingFile,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds the record for a request, or `MissingFile` when the policy rejects
/// file-less requests.
pub fn build_record(
    file: Option<&IncomingFile>,
    policy: MissingFilePolicy,
    now: DateTime<Utc>,
) -> Result<UploadRecord, UploadError> {
    match (file, policy) {
        (Some(file), _) => Ok(UploadRecord::from_file(file, now)),
        (None, MissingFilePolicy::RecordEmpty) => Ok(UploadRecord::empty(now)),
        (None, MissingFilePolicy::Reject) => Err(UploadError::MissingFile),
    }
}

/// Inserts the record for one upload request into `collection`.
///
/// The lease is released whether or not the insert succeeds.
pub async fn record_upload(
    pool: &StorePool,
    collection: &str,
    policy: MissingFilePolicy,
    file: Option<&IncomingFile>,
) -> Result<UploadRecord, UploadError> {
    let mut record = build_record(file, policy, Utc::now())?;

    let lease = pool.acquire().await?;
    // Connecting may take a while under the per-request lifecycle.
    record.upload_time = Utc::now();
    let inserted = lease.store().insert(collection, &record).await;
    let backend = lease.store().backend();
    lease.release().await;

    let id = inserted?;
    tracing::info!(
        id = %id,
        backend,
        filename = ?record.filename,
        size = record.size,
        "upload recorded"
    );
    Ok(record.with_id(id))
}
