//! Represents an image stored in the remote gallery bucket.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single stored image, as reported by the storage backend.
///
/// Only metadata lives here; the bytes stay in the remote bucket. The
/// gateway never caches payloads between requests.
#[derive(Serialize, Clone, Debug)]
pub struct StoredImage {
    /// Full object key, including the gallery namespace prefix.
    pub key: String,

    /// Size in bytes. Zero-byte entries are folder markers, not images.
    pub size_bytes: i64,

    /// Timestamp of the last write, as reported by the backend.
    pub last_modified: DateTime<Utc>,
}

/// Build the public URL for a stored object key.
///
/// Gallery clients persist these URLs, so the
/// `https://<bucket>.<region>.<domain>/<key>` shape must not change.
pub fn public_object_url(bucket: &str, region: &str, domain: &str, key: &str) -> String {
    format!("https://{}.{}.{}/{}", bucket, region, domain, key)
}
