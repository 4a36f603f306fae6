//! HTTP request router.
//!
//! Maps the four read-only endpoints onto the file operations in
//! [`crate::files`]. Filesystem work runs on the blocking thread pool so a
//! slow disk never stalls the async workers.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use protocol::{
    EntryInfo, ErrorBody, FilesystemTree, ServiceInfo, DOWNLOAD_PATH, ENTRY_INFO_PATH,
    FILESYSTEM_TREE_PATH,
};
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::files::{
    archive_name, build_archive, inspect, list, probe, FileError, FileStream, ObjectKind,
    ResolvedPath, ServeRoot,
};

/// Name reported by the service info endpoint.
pub const SERVICE_NAME: &str = "Remote File System Server";

const OCTET_STREAM: &str = "application/octet-stream";
const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// File operation error.
    #[error(transparent)]
    File(#[from] FileError),

    /// Malformed query string.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouterError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::File(FileError::Forbidden) => StatusCode::FORBIDDEN,
            RouterError::File(FileError::NotFound(_)) => StatusCode::NOT_FOUND,
            RouterError::File(FileError::InvalidType { .. }) => StatusCode::BAD_REQUEST,
            RouterError::File(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RouterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. Server-side failures are not described.
    pub fn detail(&self) -> String {
        if self.status().is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<QueryRejection> for RouterError {
    fn from(rejection: QueryRejection) -> Self {
        RouterError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            RouterError::File(FileError::Cancelled) => debug!("Request abandoned by client"),
            _ if status.is_server_error() => error!(error = %self, "Request failed"),
            _ => debug!(status = status.as_u16(), error = %self, "Request rejected"),
        }
        (status, Json(ErrorBody::new(self.detail()))).into_response()
    }
}

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    root: Arc<ServeRoot>,
    chunk_size: usize,
}

impl AppState {
    /// Create state serving `root`, streaming files in `chunk_size` pieces.
    pub fn new(root: ServeRoot, chunk_size: usize) -> Self {
        Self {
            root: Arc::new(root),
            chunk_size,
        }
    }

    /// The served root.
    pub fn root(&self) -> &ServeRoot {
        &self.root
    }
}

/// Build the router with all endpoints and request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route(ENTRY_INFO_PATH, get(entry_info))
        .route(DOWNLOAD_PATH, get(download))
        .route(FILESYSTEM_TREE_PATH, get(filesystem_tree))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    #[serde(default)]
    path: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    compress: bool,
}

#[derive(Debug, Deserialize)]
struct TreeQuery {
    #[serde(default)]
    path: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    recursive: bool,
}

/// Parse a boolean query flag.
///
/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`, ignoring case.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid boolean value: {raw}")))
}

/// Run filesystem work on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, RouterError>
where
    F: FnOnce() -> Result<T, FileError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RouterError::Internal(format!("blocking task failed: {e}")))?
        .map_err(RouterError::from)
}

async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo::new(
        SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
        state.root.path().display().to_string(),
    ))
}

async fn entry_info(
    State(state): State<AppState>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<EntryInfo>, RouterError> {
    let Query(query) = query?;
    let root = Arc::clone(&state.root);

    let info = run_blocking(move || {
        let resolved = root.resolve(&query.path)?;
        Ok(inspect(&resolved))
    })
    .await?;

    Ok(Json(info))
}

async fn filesystem_tree(
    State(state): State<AppState>,
    query: Result<Query<TreeQuery>, QueryRejection>,
) -> Result<Json<FilesystemTree>, RouterError> {
    let Query(query) = query?;
    let root = Arc::clone(&state.root);

    let listing = run_blocking(move || {
        let resolved = root.resolve(&query.path)?;
        list(&root, &resolved, query.recursive)
    })
    .await?;

    if !listing.skipped.is_empty() {
        debug!(
            entries = listing.tree.len(),
            skipped = listing.skipped.len(),
            "Listing left out entries"
        );
    }

    Ok(Json(listing.tree))
}

async fn download(
    State(state): State<AppState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, RouterError> {
    let Query(query) = query?;
    let root = Arc::clone(&state.root);
    let requested = query.path.clone();

    let (resolved, kind) = run_blocking(move || {
        let resolved = root.resolve(&requested)?;
        let kind = probe(&resolved);
        Ok((resolved, kind))
    })
    .await?;

    match kind {
        ObjectKind::File => stream_file(&state, &resolved).await,
        ObjectKind::Directory if query.compress => archive_directory(&state, resolved).await,
        ObjectKind::Directory => Err(FileError::invalid_type(
            resolved.requested(),
            "directory download requires compress=true",
        )
        .into()),
        ObjectKind::Absent => Err(FileError::NotFound(resolved.requested().to_string()).into()),
        ObjectKind::Other => {
            Err(FileError::invalid_type(resolved.requested(), "invalid path type").into())
        }
    }
}

async fn stream_file(state: &AppState, resolved: &ResolvedPath) -> Result<Response, RouterError> {
    let stream = FileStream::open(resolved, state.chunk_size).await?;
    let len = stream.len();

    debug!(requested = %resolved.requested(), bytes = len, "Streaming file");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, OCTET_STREAM)
        .header(header::CONTENT_LENGTH, len)
        .header(header::CONTENT_DISPOSITION, content_disposition(stream.name()))
        .body(Body::from_stream(stream.into_stream()))
        .map_err(|e| RouterError::Internal(e.to_string()))
}

async fn archive_directory(
    state: &AppState,
    resolved: ResolvedPath,
) -> Result<Response, RouterError> {
    let root = Arc::clone(&state.root);
    let name = archive_name(&resolved);
    let requested = resolved.requested().to_string();

    // Dropping the handler future (client gone) cancels the build.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let summary = run_blocking(move || build_archive(&root, &resolved, &cancel)).await?;

    info!(
        requested = %requested,
        files = summary.file_count,
        bytes = summary.bytes.len(),
        "Built directory archive"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ZIP_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, summary.bytes.len())
        .header(header::CONTENT_DISPOSITION, content_disposition(&name))
        .body(Body::from(summary.bytes))
        .map_err(|e| RouterError::Internal(e.to_string()))
}

/// `Content-Disposition` value naming a download.
pub fn content_disposition(name: &str) -> HeaderValue {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_bytes(format!("attachment; filename=\"{escaped}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
