//! Annotations written on managed catalog objects.
//!
//! The sync-id annotation is load-bearing: it is the only thing separating
//! objects owned by this importer installation from everything else in the
//! catalog. Every mutation path must verify it before touching a remote
//! object.

use std::collections::HashMap;

pub const ANNOTATION_SYNC_ID: &str = "catalog-importer/sync-id";
pub const ANNOTATION_LAST_SYNC_AT: &str = "catalog-importer/last-sync-at";
pub const ANNOTATION_VERSION: &str = "catalog-importer/version";

/// Importer version reported in annotations and the User-Agent header.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Annotations stamped on every created or updated managed object.
pub fn managed_annotations(sync_id: &str) -> HashMap<String, String> {
    HashMap::from([
        (ANNOTATION_SYNC_ID.to_string(), sync_id.to_string()),
        (
            ANNOTATION_LAST_SYNC_AT.to_string(),
            chrono::Utc::now().to_rfc3339(),
        ),
        (ANNOTATION_VERSION.to_string(), CLIENT_VERSION.to_string()),
    ])
}

/// Whether an object's annotations mark it as owned by the given sync id.
pub fn is_managed_by(annotations: &HashMap<String, String>, sync_id: &str) -> bool {
    annotations
        .get(ANNOTATION_SYNC_ID)
        .is_some_and(|value| value == sync_id)
}
