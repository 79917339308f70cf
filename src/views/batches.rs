use askama::Template;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use uuid::Uuid;

use super::{nav, Nav};
use crate::auth::extractor::AuthUser;
use crate::batch::UPLOAD_EXTENSIONS;
use crate::db;
use crate::error::{AppError, FieldErrors};
use crate::models::{Batch, BatchStatus};
use crate::routes;
use crate::state::SharedState;

/// A batch as listed, with its status resolved for display.
pub(crate) struct BatchRow<'a> {
    pub batch: &'a Batch,
    pub label: &'static str,
    pub css: &'static str,
    pub downloadable: bool,
}

impl<'a> BatchRow<'a> {
    pub(crate) fn new(batch: &'a Batch) -> Self {
        let status = batch.status();
        BatchRow {
            batch,
            label: status.map(|s| s.label()).unwrap_or("Desconocido"),
            css: match status {
                Some(BatchStatus::Pending) => "status-pending",
                Some(BatchStatus::Processing) => "status-processing",
                Some(BatchStatus::Completed) => "status-completed",
                Some(BatchStatus::Rejected) => "status-rejected",
                None => "",
            },
            downloadable: status == Some(BatchStatus::Completed) && batch.result_path.is_some(),
        }
    }
}

#[derive(Template)]
#[template(path = "batches/index.html")]
struct BatchesTemplate<'a> {
    nav: Nav,
    rows: Vec<BatchRow<'a>>,
    extensions: String,
    errors: FieldErrors,
}

async fn render_index(
    state: &SharedState,
    auth: &AuthUser,
    status: StatusCode,
    errors: FieldErrors,
) -> Result<Response, AppError> {
    let tenant_id = auth.require_tenant(&state.access)?;
    let batches = db::batches::list_by_tenant(&state.pool, tenant_id).await?;
    let template = BatchesTemplate {
        nav: nav(state, auth).await?,
        rows: batches.iter().map(BatchRow::new).collect(),
        extensions: UPLOAD_EXTENSIONS.join(", "),
        errors,
    };
    Ok((status, Html(template.render().unwrap_or_default())).into_response())
}

pub async fn index(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    render_index(&state, &auth, StatusCode::OK, FieldErrors::new()).await
}

pub async fn upload(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    match routes::batches::upload(&state, &auth, &headers, body).await {
        Ok(_) => Ok(Redirect::to("/batches").into_response()),
        Err(AppError::Validation(errors)) => {
            render_index(&state, &auth, StatusCode::UNPROCESSABLE_ENTITY, errors).await
        }
        Err(e) => Err(e),
    }
}

pub async fn result(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    routes::batches::download_result(State(state), auth, Path(id)).await
}
