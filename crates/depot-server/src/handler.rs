use std::io::{self, BufReader, Read, Seek, SeekFrom};

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Json, Response};
use bytes::Bytes;
use depot_service::{ContentReader, ServiceResult};
use depot_types::{validate_package, validate_version, Package, Version};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::dto::{NewPackage, NewVersion, PageParams, PagedBody};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Bytes per chunk when streaming content out.
const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the blocking reader and the response body.
const DOWNLOAD_CHANNEL_DEPTH: usize = 4;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "depot-server",
        "version": env!("CARGO_PKG_VERSION"),
        "default_page_size": state.default_page_size,
        "max_upload_size": state.max_upload_size,
    }))
}

/// Run a service call on the blocking pool; stores do synchronous I/O.
async fn blocking<T, F>(call: F) -> ApiResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

pub async fn create_package(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    payload: Result<Json<NewPackage>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Package>)> {
    let Json(body) = payload?;
    let package = body.into_package(&owner);
    validate_package(&package)?;

    let packages = state.packages.clone();
    let created = blocking(move || packages.create_package(package)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_packages(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<PagedBody<Package>>> {
    let Query(params) = params?;
    let request = params.to_request(state.default_page_size);
    let packages = state.packages.clone();
    let page = blocking(move || packages.list_packages(&owner, request)).await?;
    Ok(Json(page.into()))
}

pub async fn get_package(
    State(state): State<AppState>,
    Path((owner, reference)): Path<(String, String)>,
) -> ApiResult<Json<Package>> {
    let packages = state.packages.clone();
    let package = blocking(move || packages.get_package(&owner, &reference)).await?;
    Ok(Json(package))
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// Multipart upload: a `version` JSON part and a `file` part, in any order.
///
/// The file part is spooled to an anonymous temporary file as it arrives,
/// then streamed from there into the store on the blocking pool. Other parts
/// are ignored.
pub async fn create_version(
    State(state): State<AppState>,
    Path((owner, reference)): Path<(String, String)>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Version>)> {
    let mut entity: Option<NewVersion> = None;
    let mut upload: Option<(String, std::fs::File)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("version") => {
                let raw = field.bytes().await?;
                let parsed = serde_json::from_slice(&raw)
                    .map_err(|e| ApiError::BadRequest(format!("invalid version part: {e}")))?;
                entity = Some(parsed);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let spooled = spool(&mut field).await?;
                upload = Some((filename, spooled));
            }
            other => debug!(part = ?other, "ignoring unexpected multipart part"),
        }
    }

    let entity = entity.ok_or_else(|| ApiError::BadRequest("missing `version` part".into()))?;
    let (filename, file) =
        upload.ok_or_else(|| ApiError::BadRequest("missing `file` part".into()))?;

    let version = entity.into_version(&owner, &reference, filename);
    validate_version(&version)?;

    let versions = state.versions.clone();
    let created = blocking(move || versions.create_version(version, BufReader::new(file))).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Copy a multipart field chunk by chunk into a rewound anonymous temp file.
async fn spool(field: &mut Field<'_>) -> ApiResult<std::fs::File> {
    let tmp = tempfile::tempfile().map_err(internal_io)?;
    let mut out = tokio::fs::File::from_std(tmp);
    while let Some(chunk) = field.chunk().await? {
        out.write_all(&chunk).await.map_err(internal_io)?;
    }
    out.flush().await.map_err(internal_io)?;

    let mut file = out.into_std().await;
    file.seek(SeekFrom::Start(0)).map_err(internal_io)?;
    Ok(file)
}

fn internal_io(e: io::Error) -> ApiError {
    ApiError::Internal(format!("upload spool failed: {e}"))
}

pub async fn list_versions(
    State(state): State<AppState>,
    Path((owner, reference)): Path<(String, String)>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<PagedBody<Version>>> {
    let Query(params) = params?;
    let request = params.to_request(state.default_page_size);
    let versions = state.versions.clone();
    let page = blocking(move || versions.list_versions(&owner, &reference, request)).await?;
    Ok(Json(page.into()))
}

pub async fn get_version(
    State(state): State<AppState>,
    Path((owner, reference, version_id)): Path<(String, String, String)>,
) -> ApiResult<Json<Version>> {
    let versions = state.versions.clone();
    let version =
        blocking(move || versions.describe_version(&owner, &reference, &version_id)).await?;
    Ok(Json(version))
}

/// Stream a version's content as `application/octet-stream`.
pub async fn download_version(
    State(state): State<AppState>,
    Path((owner, reference, version_id)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let versions = state.versions.clone();
    let stored =
        blocking(move || versions.get_version(&owner, &reference, &version_id)).await?;
    let version = stored.version;

    let (tx, rx) = mpsc::channel(DOWNLOAD_CHANNEL_DEPTH);
    tokio::task::spawn_blocking(move || pump(stored.content, tx));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, version.length)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", header_safe(&version.filename)),
        )
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|e| ApiError::Internal(format!("building download response: {e}")))
}

/// Feed `content` into the response channel until it ends, fails, or the
/// client goes away.
fn pump(mut content: ContentReader, tx: mpsc::Sender<io::Result<Bytes>>) {
    let mut buf = vec![0u8; DOWNLOAD_CHUNK_SIZE];
    loop {
        let chunk = match content.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => Ok(Bytes::copy_from_slice(&buf[..n])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "content stream failed mid-download");
                Err(e)
            }
        };
        let failed = chunk.is_err();
        if tx.blocking_send(chunk).is_err() || failed {
            return;
        }
    }
}

/// Restrict a filename to characters allowed inside a quoted header value.
fn header_safe(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
