//! src/services/storage_service.rs
//!
//! ObjectStore — the seam between the gateway handlers and the remote
//! S3-compatible bucket. This file intentionally holds **no** request
//! handling or response mapping; it covers exactly one concern: issuing
//! object-storage calls and reporting their outcome. `SpacesStore` is the
//! production implementation; tests substitute an in-memory store.

use crate::config::GatewayConfig;
use crate::models::image::{StoredImage, public_object_url};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{Delete, ObjectCannedAcl, ObjectIdentifier},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Namespace prefix under which every managed object lives. Keys outside it
/// are never listed and never reachable through delete operations.
pub const GALLERY_PREFIX: &str = "gallery/";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One key that could not be removed inside a batch delete.
#[derive(Debug, Clone)]
pub struct BatchDeleteError {
    pub key: String,
    pub message: String,
}

/// Outcome of a batch delete: which keys went away and which did not.
#[derive(Debug, Default)]
pub struct BatchDeleteOutcome {
    pub deleted: Vec<String>,
    pub errors: Vec<BatchDeleteError>,
}

/// Backend operations the gateway relies on. No retries: every call
/// surfaces its first failure.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store one object under `key` with the given content type.
    async fn put(&self, key: &str, content_type: &str, body: Bytes) -> StorageResult<()>;

    /// List every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredImage>>;

    /// Delete one object. `NotFound` if the backend has no such key.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Delete a batch of keys in one call, reporting per-key failures.
    async fn delete_batch(&self, keys: &[String]) -> StorageResult<BatchDeleteOutcome>;

    /// Cheap readiness probe against the backend.
    async fn probe(&self) -> StorageResult<()>;

    /// Public URL for a stored key.
    fn public_url(&self, key: &str) -> String;
}

/// Shared state handed to every handler: the backend client plus the one
/// piece of configuration requests check directly. Built once at startup,
/// never mutated.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn ObjectStore>,
    pub admin_secret: Arc<str>,
}

/// Generate the object key for an uploaded file name.
///
/// Keys are `gallery/<unix-ms>-<sanitized-name>`, so listings under the
/// namespace prefix roughly follow upload order.
pub fn object_key(original_name: &str, timestamp_ms: i64) -> String {
    format!(
        "{}{}-{}",
        GALLERY_PREFIX,
        timestamp_ms,
        sanitize_file_name(original_name)
    )
}

/// Sanitize a client-supplied file name for use inside an object key.
///
/// The stem is lowercased and every character outside `[a-z0-9._-]` becomes
/// a dash; dash runs collapse. The extension, if any, is kept lowercased.
/// A name with nothing usable left falls back to `file`.
pub fn sanitize_file_name(name: &str) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut cleaned = String::with_capacity(stem.len());
    let mut last_dash = false;
    for ch in stem.chars().flat_map(char::to_lowercase) {
        if matches!(ch, 'a'..='z' | '0'..='9' | '.' | '_') {
            cleaned.push(ch);
            last_dash = false;
        } else if !last_dash {
            cleaned.push('-');
            last_dash = true;
        }
    }
    let cleaned = cleaned.trim_matches('-');
    let stem = if cleaned.is_empty() { "file" } else { cleaned };

    match ext {
        Some(ext) => format!("{}.{}", stem, ext.to_ascii_lowercase()),
        None => stem.to_string(),
    }
}

/// Production store backed by an S3-compatible bucket (DigitalOcean Spaces
/// addressing). Cheap to clone; the inner client pools connections.
#[derive(Clone)]
pub struct SpacesStore {
    client: Client,
    bucket: String,
    region: String,
    public_domain: String,
}

impl SpacesStore {
    /// Build a client for the configured bucket using static credentials
    /// and the region-scoped endpoint.
    pub fn new(cfg: &GatewayConfig) -> Self {
        let credentials = Credentials::new(
            cfg.access_key.clone(),
            cfg.secret_key.clone(),
            None,
            None,
            "gallery-gateway",
        );
        let endpoint = format!("https://{}.{}", cfg.region, cfg.storage_domain);
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: cfg.bucket.clone(),
            region: cfg.region.clone(),
            public_domain: cfg.storage_domain.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for SpacesStore {
    async fn put(&self, key: &str, content_type: &str, body: Bytes) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| {
                let detail = format!("{}", DisplayErrorContext(err));
                error!(key, "put_object failed: {detail}");
                StorageError::Backend(detail)
            })?;

        debug!(key, "stored object");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredImage>> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|err| {
                let detail = format!("{}", DisplayErrorContext(err));
                error!(prefix, "list_objects_v2 failed: {detail}");
                StorageError::Backend(detail)
            })?;

        let mut images = Vec::new();
        for obj in resp.contents() {
            let Some(key) = obj.key() else { continue };
            let last_modified = obj
                .last_modified()
                .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            images.push(StoredImage {
                key: key.to_string(),
                size_bytes: obj.size().unwrap_or(0),
                last_modified,
            });
        }
        Ok(images)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        // DeleteObject on an S3-compatible backend succeeds silently for a
        // missing key, so probe first to keep the not-found contract.
        if let Err(err) = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            if err
                .as_service_error()
                .map(|e| e.is_not_found())
                .unwrap_or(false)
            {
                return Err(StorageError::NotFound(key.to_string()));
            }
            let detail = format!("{}", DisplayErrorContext(err));
            error!(key, "head_object failed: {detail}");
            return Err(StorageError::Backend(detail));
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let detail = format!("{}", DisplayErrorContext(err));
                error!(key, "delete_object failed: {detail}");
                StorageError::Backend(detail)
            })?;

        debug!(key, "deleted object");
        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<BatchDeleteOutcome> {
        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            let id = ObjectIdentifier::builder()
                .key(key)
                .build()
                .map_err(|err| StorageError::Backend(err.to_string()))?;
            objects.push(id);
        }
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|err| StorageError::Backend(err.to_string()))?;

        let resp = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|err| {
                let detail = format!("{}", DisplayErrorContext(err));
                error!(count = keys.len(), "delete_objects failed: {detail}");
                StorageError::Backend(detail)
            })?;

        let mut outcome = BatchDeleteOutcome::default();
        for deleted in resp.deleted() {
            if let Some(key) = deleted.key() {
                outcome.deleted.push(key.to_string());
            }
        }
        for err in resp.errors() {
            outcome.errors.push(BatchDeleteError {
                key: err.key().unwrap_or_default().to_string(),
                message: err.message().unwrap_or("delete failed").to_string(),
            });
        }
        Ok(outcome)
    }

    async fn probe(&self) -> StorageResult<()> {
        self.client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(GALLERY_PREFIX)
            .max_keys(1)
            .send()
            .await
            .map_err(|err| StorageError::Backend(format!("{}", DisplayErrorContext(err))))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(&self.bucket, &self.region, &self.public_domain, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_shape() {
        let key = object_key("My Photo.JPG", 1700000000000);
        assert_eq!(key, "gallery/1700000000000-my-photo.jpg");
    }

    #[test]
    fn test_object_key_always_under_namespace() {
        for name in ["a.png", "../../etc/passwd", "", "weird name!!.gif"] {
            assert!(object_key(name, 1).starts_with(GALLERY_PREFIX));
        }
    }

    #[test]
    fn test_sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_file_name("sunset_01.png"), "sunset_01.png");
        assert_eq!(sanitize_file_name("photo.final.jpg"), "photo.final.jpg");
    }

    #[test]
    fn test_sanitize_replaces_and_collapses() {
        assert_eq!(sanitize_file_name("My  Photo!!.PNG"), "my-photo.png");
        assert_eq!(sanitize_file_name("a/b\\c.gif"), "a-b-c.gif");
    }

    #[test]
    fn test_sanitize_empty_stem_falls_back() {
        assert_eq!(sanitize_file_name("???.jpg"), "file.jpg");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn test_sanitize_name_without_extension() {
        assert_eq!(sanitize_file_name("snapshot"), "snapshot");
        assert_eq!(sanitize_file_name(".hidden"), ".hidden");
    }
}
