//! Static asset fast path: files shipped inside a backend folder are served
//! straight from disk without touching the backend process.

use std::path::{Path, PathBuf};

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::registry::BackendRegistry;

/// Extensions eligible for the fast path and the content type each is served with.
const CONTENT_TYPES: [(&str, &str); 10] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("ico", "image/x-icon"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
];

/// Content type of a sub-path whose final segment has an allow-listed extension.
pub fn content_type_for(sub_path: &str) -> Option<&'static str> {
    let last = sub_path.rsplit('/').next()?;
    let (_, extension) = last.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

/// Serve `sub_path` from the folder of backend `key`.
///
/// `None` means the request should be forwarded instead.
pub async fn serve(registry: &BackendRegistry, key: &str, sub_path: &str) -> Option<Response> {
    let content_type = content_type_for(sub_path)?;
    let dir = registry.folder(key).await?;
    let file = resolve_within(&dir, sub_path).await?;

    match tokio::fs::read(&file).await {
        Ok(contents) => {
            tracing::debug!("Serving {} for {} from disk", file.display(), key);
            Some(([(header::CONTENT_TYPE, content_type)], contents).into_response())
        }
        Err(e) => {
            tracing::warn!("Error serving static file {}: {}", file.display(), e);
            None
        }
    }
}

/// Regular file at `base/sub_path` that does not escape `base`.
async fn resolve_within(base: &Path, sub_path: &str) -> Option<PathBuf> {
    let base = tokio::fs::canonicalize(base).await.ok()?;
    let candidate = tokio::fs::canonicalize(base.join(sub_path.trim_start_matches('/')))
        .await
        .ok()?;

    if !candidate.starts_with(&base) {
        tracing::warn!("Rejected static path {} outside {}", sub_path, base.display());
        return None;
    }

    let metadata = tokio::fs::metadata(&candidate).await.ok()?;
    metadata.is_file().then_some(candidate)
}
