//! Upload HTTP service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness message, independent of the document store |
//! | `GET`  | `/health` | Status, version and store readiness |
//! | `POST` | `/upload` | Record one multipart `file` field |
//! | `POST` | `/api/upload` | Same handler as `/upload` |
//!
//! # Error Contract
//!
//! Every error response has the same shape:
//!
//! ```json
//! { "success": false, "error": "missing_file", "message": "No file uploaded" }
//! ```
//!
//! Error codes: `missing_file` (400), `multiple_files` (400),
//! `invalid_multipart` (400), `payload_too_large` (413),
//! `store_unavailable` (503), `store_error` (500). Store failures never carry
//! driver details; those are logged.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser forms on other
//! origins can post uploads.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::hosting;
use crate::models::{IncomingFile, UploadRecord};
use crate::store::pool::StorePool;
use crate::store::StoreError;
use crate::upload::{self, UploadError};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    /// Injected at startup; handlers never connect on their own.
    pool: Arc<StorePool>,
}

impl AppState {
    pub fn new(config: Config, pool: Arc<StorePool>) -> Self {
        Self {
            config: Arc::new(config),
            pool,
        }
    }
}

/// Builds the router. This is the single request-handling function that
/// every hosting adapter drives.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/upload", post(handle_upload))
        .route("/api/upload", post(handle_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Starts the upload service.
///
/// Builds the store pool from `[store]`, performs the startup connection for
/// the shared lifecycle (retrying in the background on failure), and hands
/// the router to the adapter selected by `server.hosting`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = Arc::new(StorePool::from_config(&config.store)?);
    let retry = Duration::from_secs(config.store.retry_interval_secs);
    tracing::info!(
        lifecycle = ?pool.lifecycle(),
        collection = %config.store.collection,
        missing_file = ?config.upload.missing_file,
        "starting upload service"
    );
    let reconnect = pool.start(retry).await;

    let state = AppState::new(config.clone(), pool.clone());
    let result = hosting::serve(config, router(state)).await;

    if let Some(task) = reconnect {
        task.abort();
    }
    pool.shutdown().await;
    result
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    /// Machine-readable error code.
    error: String,
    /// Fixed human-readable message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(code: &'static str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code,
        message: message.into(),
    }
}

fn store_unavailable() -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "store_unavailable",
        message: "Document store is unavailable, try again later".to_string(),
    }
}

fn store_error() -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "store_error",
        message: "Failed to save upload record".to_string(),
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code: "payload_too_large",
            message: "Upload exceeds the maximum allowed size".to_string(),
        }
    } else {
        bad_request(
            "invalid_multipart",
            format!("Failed to parse multipart data: {}", err.body_text()),
        )
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingFile => bad_request("missing_file", "No file uploaded"),
            UploadError::Store(StoreError::Unavailable(reason)) => {
                tracing::warn!(%reason, "upload refused: document store unavailable");
                store_unavailable()
            }
            UploadError::Store(e) => {
                tracing::error!(error = %e, "upload failed");
                store_error()
            }
        }
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "API is running".to_string(),
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
    /// `"ready"` or `"unavailable"`.
    store: String,
}

/// Handler for `GET /health`. Always 200; store readiness is reported, not enforced.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = if state.pool.is_ready() {
        "ready"
    } else {
        "unavailable"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store.to_string(),
    })
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: String,
    data: UploadRecord,
}

/// Handler for `POST /upload` and `POST /api/upload`.
///
/// A request that is not multipart at all is treated as carrying no file
/// field, so it follows the same missing-file policy.
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let file = match multipart {
        Ok(mut multipart) => read_file_field(&mut multipart).await?,
        Err(rejection) => {
            tracing::debug!(%rejection, "upload request is not multipart");
            None
        }
    };

    let record = upload::record_upload(
        &state.pool,
        &state.config.store.collection,
        state.config.upload.missing_file,
        file.as_ref(),
    )
    .await
    .map_err(|e| {
        if matches!(e, UploadError::MissingFile) {
            tracing::warn!("upload rejected: no file field");
        }
        AppError::from(e)
    })?;

    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded successfully".to_string(),
        data: record,
    }))
}

/// Reads the `file` field into memory. Other fields are skipped; a second
/// `file` field is rejected.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<IncomingFile>, AppError> {
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        if file.is_some() {
            return Err(bad_request(
                "multiple_files",
                "Only one file may be uploaded per request",
            ));
        }

        let filename = field.file_name().map(str::to_string);
        let mimetype = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        file = Some(IncomingFile {
            filename,
            mimetype,
            bytes: bytes.to_vec(),
        });
    }

    Ok(file)
}
