use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::batch::{self, storage};
use crate::db;
use crate::error::{AppError, FieldErrors};
use crate::middleware::audit;
use crate::models::{Batch, BatchStatus};
use crate::state::SharedState;

/// Store an uploaded lot for the caller's tenant. Shared with the HTML upload form.
pub(crate) async fn upload(
    state: &SharedState,
    auth: &AuthUser,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Batch, AppError> {
    let tenant_id = auth.require_tenant(&state.access)?;

    let mut form = batch::parse_multipart(headers, body).await?;
    let Some(file) = form.take_file("file") else {
        let mut errors = FieldErrors::new();
        errors.insert("file".to_string(), "Seleccione un archivo".to_string());
        return Err(AppError::Validation(errors));
    };
    batch::validate_upload(&file, state.config.max_upload_size, batch::UPLOAD_EXTENSIONS)?;

    let path = storage::store(&state.config.upload_dir, "batches", &file.file_name, &file.data).await?;
    let path = path.to_string_lossy().into_owned();
    let created = match db::batches::create(&state.pool, tenant_id, auth.user_id, &file.file_name, &path).await {
        Ok(created) => created,
        Err(e) => {
            storage::remove(&path).await;
            return Err(e.into());
        }
    };

    audit::log_event(
        &state.pool,
        Some(tenant_id),
        Some(auth.user_id),
        "batch.uploaded",
        "batch",
        Some(created.id),
        Some(json!({ "file_name": created.file_name, "bytes": file.data.len() })),
    )
    .await;

    tracing::info!(batch_id = %created.id, %tenant_id, "Batch uploaded");
    Ok(created)
}

pub async fn list(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Vec<Batch>>, AppError> {
    let tenant_id = auth.require_tenant(&state.access)?;
    let batches = db::batches::list_by_tenant(&state.pool, tenant_id).await?;
    Ok(Json(batches))
}

pub async fn create(
    State(state): State<SharedState>,
    auth: AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Batch>), AppError> {
    let created = upload(&state, &auth, &headers, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// The result document of a completed lot of the caller's tenant.
pub async fn download_result(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let tenant_id = auth.require_tenant(&state.access)?;
    let found = db::batches::find_by_id_scoped(&state.pool, id, tenant_id)
        .await?
        .filter(|b| b.status() == Some(BatchStatus::Completed))
        .ok_or_else(|| state.access.not_found("Batch"))?;

    let (Some(name), Some(path)) = (&found.result_file_name, &found.result_path) else {
        return Err(state.access.not_found("Result"));
    };

    let data = storage::read(path).await?;
    Ok(batch::attachment(data, name))
}
