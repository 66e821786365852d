//! HTTP handlers for the gallery operations: upload, list, delete single,
//! delete batch. Auth and input validation happen here, before any storage
//! call; backend access goes through `ObjectStore`.

use crate::{
    errors::ApiError,
    services::storage_service::{
        BatchDeleteError, GALLERY_PREFIX, GatewayState, StorageError, object_key,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Upload batch cap, matching what the gallery frontend sends.
pub const MAX_UPLOAD_FILES: usize = 10;
/// Per-file size cap.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    urls: Vec<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct BatchErrorEntry {
    key: String,
    message: String,
}

impl From<BatchDeleteError> for BatchErrorEntry {
    fn from(err: BatchDeleteError) -> Self {
        Self {
            key: err.key,
            message: err.message,
        }
    }
}

#[derive(Serialize)]
struct BatchDeleteResponse {
    message: String,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<BatchErrorEntry>,
}

/// Mutating operations require the shared admin secret in `authorization`.
fn ensure_admin(headers: &HeaderMap, secret: &str) -> Result<(), ApiError> {
    match headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        Some(token) if token == secret => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

/// POST `/upload` — multipart batch of up to [`MAX_UPLOAD_FILES`] files in
/// the `images` field, each at most [`MAX_FILE_BYTES`]. Files are keyed
/// under the gallery namespace and stored concurrently; the response
/// carries one public URL per file.
pub async fn upload_images(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&headers, &state.admin_secret)?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::InvalidInput(format!("malformed multipart body: {}", err)))?
    {
        if field.name() != Some("images") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|err| {
            ApiError::InvalidInput(format!("failed to read `{}`: {}", file_name, err))
        })?;

        if data.len() > MAX_FILE_BYTES {
            return Err(ApiError::InvalidInput(format!(
                "`{}` exceeds the {} MiB limit",
                file_name,
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
        files.push((file_name, content_type, data));
        if files.len() > MAX_UPLOAD_FILES {
            return Err(ApiError::InvalidInput(format!(
                "at most {} files per upload",
                MAX_UPLOAD_FILES
            )));
        }
    }

    if files.is_empty() {
        return Err(ApiError::InvalidInput("no files uploaded".into()));
    }

    let uploads = files.into_iter().map(|(file_name, content_type, data)| {
        let store = state.store.clone();
        async move {
            let key = object_key(&file_name, Utc::now().timestamp_millis());
            store.put(&key, &content_type, data).await?;
            Ok::<_, ApiError>(store.public_url(&key))
        }
    });
    let urls = try_join_all(uploads).await?;

    info!(count = urls.len(), "uploaded images");
    Ok(Json(UploadResponse {
        message: format!("{} image(s) uploaded", urls.len()),
        urls,
    }))
}

/// GET `/images` — public listing of every image under the gallery
/// namespace, newest first. Zero-byte entries are folder markers and are
/// dropped. An empty gallery yields `[]`, never an error.
pub async fn list_images(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut images = state.store.list(GALLERY_PREFIX).await?;
    images.retain(|img| img.size_bytes > 0);
    // stable sort keeps backend order for equal timestamps
    images.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    let urls = images
        .iter()
        .map(|img| state.store.public_url(&img.key))
        .collect();
    Ok(Json(urls))
}

/// DELETE `/image/{key}` — remove one image. The key is the portion after
/// the namespace prefix; anything outside the namespace is unreachable.
pub async fn delete_image(
    State(state): State<GatewayState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&headers, &state.admin_secret)?;

    let full_key = format!("{}{}", GALLERY_PREFIX, key);
    state
        .store
        .delete(&full_key)
        .await
        .map_err(|err| match err {
            StorageError::NotFound(_) => ApiError::NotFound(key.clone()),
            other => ApiError::from(other),
        })?;

    info!(key = %full_key, "deleted image");
    Ok(Json(MessageResponse {
        message: format!("`{}` deleted", key),
    }))
}

/// DELETE `/images/batch` — remove a batch of images in one backend call.
/// Body: `{"keys": [..]}`, non-empty, strings only. Full success maps to
/// 200; a mixed outcome maps to 207 with per-key errors.
pub async fn delete_images_batch(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    ensure_admin(&headers, &state.admin_secret)?;

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::InvalidInput(format!("malformed JSON body: {}", err)))?;
    let keys = match payload.get("keys").and_then(Value::as_array) {
        Some(keys) if !keys.is_empty() => keys,
        _ => {
            return Err(ApiError::InvalidInput(
                "`keys` must be a non-empty array".into(),
            ));
        }
    };

    let mut full_keys = Vec::with_capacity(keys.len());
    for key in keys {
        let Some(key) = key.as_str() else {
            return Err(ApiError::InvalidInput(
                "`keys` entries must be strings".into(),
            ));
        };
        full_keys.push(format!("{}{}", GALLERY_PREFIX, key));
    }

    let outcome = state.store.delete_batch(&full_keys).await?;

    if outcome.errors.is_empty() {
        let body = BatchDeleteResponse {
            message: format!("{} image(s) deleted", outcome.deleted.len()),
            deleted: outcome.deleted,
            errors: Vec::new(),
        };
        return Ok((StatusCode::OK, Json(body)).into_response());
    }

    warn!(
        deleted = outcome.deleted.len(),
        failed = outcome.errors.len(),
        "batch delete partially failed"
    );
    let body = BatchDeleteResponse {
        message: "some images could not be deleted".into(),
        deleted: outcome.deleted,
        errors: outcome.errors.into_iter().map(Into::into).collect(),
    };
    Ok((StatusCode::MULTI_STATUS, Json(body)).into_response())
}
