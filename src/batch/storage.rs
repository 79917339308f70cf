use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::AppError;

/// Write `data` under `{root}/{kind}/` with a unique, sanitized name and
/// return the stored path.
pub async fn store(root: &Path, kind: &str, file_name: &str, data: &[u8]) -> Result<PathBuf, AppError> {
    let dir = root.join(kind);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create {}: {e}", dir.display())))?;

    let path = dir.join(format!("{}-{}", Uuid::now_v7(), sanitize(file_name)));
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write {}: {e}", path.display())))?;

    tracing::debug!(path = %path.display(), bytes = data.len(), "Stored upload");
    Ok(path)
}

pub async fn read(path: &str) -> Result<Vec<u8>, AppError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::NotFound("File not found".to_string()),
        _ => AppError::Internal(format!("Failed to read {path}: {e}")),
    })
}

/// Delete a stored file. Failures are logged; a file that is already gone is fine.
pub async fn remove(path: &str) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path, "Removed stored file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path, "Failed to remove stored file: {e}"),
    }
}

/// Keep the base name only, restricted to `[A-Za-z0-9._-]`.
pub fn sanitize(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "archivo".to_string()
    } else {
        cleaned.to_string()
    }
}
