//! Bulk screening lots: upload parsing and on-disk storage of the files.

pub mod storage;

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::error::{AppError, FieldErrors};

/// Lot files tenants may upload.
pub const UPLOAD_EXTENSIONS: &[&str] = &["csv", "txt", "xlsx", "xls"];
/// Result documents the back-office may attach.
pub const RESULT_EXTENSIONS: &[&str] = &["csv", "txt", "xlsx", "xls", "pdf", "zip"];

#[derive(Debug)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub data: Bytes,
}

/// A parsed `multipart/form-data` body: plain text fields plus file parts.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Take the file sent as `name`, ignoring empty file inputs.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let idx = self
            .files
            .iter()
            .position(|f| f.field == name && !f.data.is_empty())?;
        Some(self.files.swap_remove(idx))
    }
}

/// Serve stored bytes as a download named `file_name`.
pub fn attachment(data: Vec<u8>, file_name: &str) -> Response {
    let name = storage::sanitize(file_name);
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        data,
    )
        .into_response()
}

pub async fn parse_multipart(headers: &HeaderMap, body: Bytes) -> Result<UploadForm, AppError> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| AppError::BadRequest("Expected multipart/form-data".to_string()))?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Field read error: {e}")))?;
                form.files.push(UploadedFile {
                    field: name,
                    file_name,
                    data,
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Field read error: {e}")))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Check an uploaded file against the size cap and an extension list.
pub fn validate_upload(file: &UploadedFile, max_size: usize, allowed: &[&str]) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    if file.data.len() > max_size {
        errors.insert(
            file.field.clone(),
            format!("El archivo supera el máximo de {} bytes", max_size),
        );
    }
    if !has_extension(&file.file_name, allowed) {
        errors.insert(
            file.field.clone(),
            format!("Extensión no permitida. Use: {}", allowed.join(", ")),
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn has_extension(file_name: &str, allowed: &[&str]) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
