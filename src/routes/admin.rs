use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::analytics::dashboard::{self, MonthlyReport, PlatformDashboard};
use crate::analytics::{Month, Window, WINDOW_DAYS};
use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::batch::{self, storage};
use crate::db;
use crate::db::batches::BatchWithTenant;
use crate::error::{conflict_on_unique, AppError, FieldErrors};
use crate::middleware::audit;
use crate::models::{AuditEvent, Batch, BatchStatus, Tenant, TenantWithCounts, User};
use crate::state::SharedState;

pub const BATCHES_PER_PAGE: i64 = 25;

// --- Dashboard & reports ---

#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    pub tenant_id: Option<String>,
    pub month: Option<String>,
    pub page: Option<i64>,
}

impl TenantQuery {
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

pub(crate) async fn platform_dashboard(
    state: &SharedState,
    auth: &AuthUser,
    q: &TenantQuery,
) -> Result<PlatformDashboard, AppError> {
    let scope = auth.platform_scope(&state.access, None)?;
    let window = Window::trailing_days(Utc::now(), WINDOW_DAYS);
    Ok(dashboard::platform(&state.pool, &scope, &window, q.tenant_id()).await?)
}

pub(crate) async fn monthly(
    state: &SharedState,
    auth: &AuthUser,
    q: &TenantQuery,
) -> Result<MonthlyReport, AppError> {
    let tenant_id = q.tenant_id();
    let scope = auth.platform_scope(&state.access, tenant_id)?;
    let month = Month::parse_or(q.month.as_deref(), Utc::now().date_naive());
    Ok(dashboard::monthly_report(&state.pool, &scope, month, tenant_id).await?)
}

pub async fn get_dashboard(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<TenantQuery>,
) -> Result<Json<PlatformDashboard>, AppError> {
    Ok(Json(platform_dashboard(&state, &auth, &q).await?))
}

pub async fn monthly_report(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<TenantQuery>,
) -> Result<Json<MonthlyReport>, AppError> {
    Ok(Json(monthly(&state, &auth, &q).await?))
}

// --- Tenants ---

#[derive(Deserialize)]
pub struct TenantRequest {
    pub name: String,
    pub slug: Option<String>,
}

impl TenantRequest {
    fn validated(&self) -> Result<(String, String), AppError> {
        let name = self.name.trim().to_string();
        let slug = slugify(self.slug.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(name.as_str()));
        let mut errors = FieldErrors::new();
        if name.is_empty() {
            errors.insert("name".to_string(), "Name is required".to_string());
        }
        if slug.is_empty() {
            errors.insert("slug".to_string(), "Slug is required".to_string());
        }
        if errors.is_empty() {
            Ok((name, slug))
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Serialize)]
pub struct TenantDetail {
    pub tenant: Tenant,
    pub members: Vec<User>,
}

pub async fn list_tenants(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<TenantWithCounts>>, AppError> {
    auth.require_superuser(&state.access)?;
    let tenants = db::tenants::list_with_counts(&state.pool).await?;
    Ok(Json(tenants))
}

pub async fn create_tenant(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<TenantRequest>,
) -> Result<Json<Tenant>, AppError> {
    auth.require_superuser(&state.access)?;
    let (name, slug) = req.validated()?;

    let tenant = db::tenants::create(&state.pool, &name, &slug)
        .await
        .map_err(|e| conflict_on_unique(e, "A tenant with this slug already exists"))?;

    audit::log_event(
        &state.pool,
        Some(tenant.id),
        Some(auth.user_id),
        "tenant.created",
        "tenant",
        Some(tenant.id),
        None,
    )
    .await;

    Ok(Json(tenant))
}

pub async fn get_tenant(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantDetail>, AppError> {
    auth.require_superuser(&state.access)?;

    let tenant = db::tenants::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| state.access.not_found("Tenant"))?;
    let members = db::users::list_all(&state.pool, Some(id)).await?;

    Ok(Json(TenantDetail { tenant, members }))
}

pub async fn update_tenant(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TenantRequest>,
) -> Result<Json<Tenant>, AppError> {
    auth.require_superuser(&state.access)?;
    let (name, slug) = req.validated()?;

    let tenant = db::tenants::update(&state.pool, id, &name, &slug)
        .await
        .map_err(|e| conflict_on_unique(e, "A tenant with this slug already exists"))?
        .ok_or_else(|| state.access.not_found("Tenant"))?;

    audit::log_event(
        &state.pool,
        Some(tenant.id),
        Some(auth.user_id),
        "tenant.updated",
        "tenant",
        Some(tenant.id),
        None,
    )
    .await;

    Ok(Json(tenant))
}

/// Hard delete. Searches and batches go with the tenant; users stay with no tenant.
pub async fn delete_tenant(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_superuser(&state.access)?;

    let files = db::batches::file_paths_for_tenant(&state.pool, id).await?;
    if !db::tenants::delete(&state.pool, id).await? {
        return Err(state.access.not_found("Tenant"));
    }
    for path in &files {
        storage::remove(path).await;
    }

    audit::log_event(
        &state.pool,
        None,
        Some(auth.user_id),
        "tenant.deleted",
        "tenant",
        Some(id),
        None,
    )
    .await;

    tracing::info!(tenant_id = %id, "Tenant deleted");
    Ok(Json(json!({ "message": "Deleted" })))
}

// --- Users ---

#[derive(Deserialize)]
pub struct CreateUser {
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub is_superior: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Partial update. `tenant_id: null` detaches the user from its tenant;
/// leaving the key out keeps it.
#[derive(Deserialize, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub tenant_id: Option<Option<Uuid>>,
    pub is_superior: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn check_identity(email: &str, name: &str) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    if !email.contains('@') || email.len() > 255 {
        errors.insert("email".to_string(), "A valid email is required".to_string());
    }
    if name.is_empty() || name.chars().count() > 255 {
        errors.insert("name".to_string(), "Name is required".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

async fn ensure_tenant(state: &SharedState, tenant_id: Option<Uuid>) -> Result<Option<Tenant>, AppError> {
    match tenant_id {
        Some(id) => db::tenants::find_by_id(&state.pool, id)
            .await?
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Tenant does not exist".to_string())),
        None => Ok(None),
    }
}

pub async fn list_users(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<TenantQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require_superuser(&state.access)?;
    let users = db::users::list_all(&state.pool, q.tenant_id()).await?;
    Ok(Json(users))
}

pub async fn create_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateUser>,
) -> Result<Json<User>, AppError> {
    auth.require_superuser(&state.access)?;

    let email = req.email.trim();
    let name = req.name.trim();
    check_identity(email, name)?;
    password::check_strength(&req.password)?;
    let tenant = ensure_tenant(&state, req.tenant_id).await?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(
        &state.pool,
        &db::users::NewUser {
            tenant_id: req.tenant_id,
            email,
            password_hash: &pw_hash,
            name,
            is_superior: req.is_superior,
            is_superuser: req.is_superuser,
        },
    )
    .await
    .map_err(|e| conflict_on_unique(e, "A user with this email already exists"))?;

    if let Some(ref mailer) = state.system_mailer {
        if let Err(e) = mailer
            .send_welcome(
                &user.email,
                &user.name,
                tenant.as_ref().map(|t| t.name.as_str()),
                &state.config.base_url,
            )
            .await
        {
            tracing::warn!("Failed to send welcome email: {e}");
        }
    }

    audit::log_event(
        &state.pool,
        user.tenant_id,
        Some(auth.user_id),
        "user.created",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok(Json(user))
}

pub async fn get_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    auth.require_superuser(&state.access)?;
    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| state.access.not_found("User"))?;
    Ok(Json(user))
}

pub async fn update_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUser>,
) -> Result<Json<User>, AppError> {
    auth.require_superuser(&state.access)?;

    let current = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| state.access.not_found("User"))?;

    if id == auth.user_id && req.is_active == Some(false) {
        return Err(AppError::BadRequest("You cannot deactivate yourself".to_string()));
    }

    let email = req.email.as_deref().map(str::trim).unwrap_or(current.email.as_str());
    let name = req.name.as_deref().map(str::trim).unwrap_or(current.name.as_str());
    check_identity(email, name)?;

    let tenant_id = req.tenant_id.unwrap_or(current.tenant_id);
    ensure_tenant(&state, tenant_id).await?;

    if let Some(new_password) = &req.password {
        password::check_strength(new_password)?;
    }

    let changes = db::users::UserChanges {
        tenant_id,
        email,
        name,
        is_superior: req.is_superior.unwrap_or(current.is_superior),
        is_superuser: req.is_superuser.unwrap_or(current.is_superuser),
        is_active: req.is_active.unwrap_or(current.is_active),
    };
    let user = db::users::update(&state.pool, id, &changes)
        .await
        .map_err(|e| conflict_on_unique(e, "A user with this email already exists"))?;

    if let Some(new_password) = &req.password {
        let pw_hash = password::hash(new_password).map_err(AppError::Internal)?;
        db::users::update_password(&state.pool, id, &pw_hash).await?;
    }

    // Sessions carry the old tenant and flags
    db::refresh_tokens::revoke_user(&state.pool, id).await?;

    audit::log_event(
        &state.pool,
        user.tenant_id,
        Some(auth.user_id),
        "user.updated",
        "user",
        Some(user.id),
        Some(json!({ "password_reset": req.password.is_some() })),
    )
    .await;

    Ok(Json(user))
}

/// Soft delete: the account is deactivated and its sessions revoked.
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_superuser(&state.access)?;

    if id == auth.user_id {
        return Err(AppError::BadRequest("You cannot deactivate yourself".to_string()));
    }

    if !db::users::deactivate(&state.pool, id).await? {
        return Err(state.access.not_found("User"));
    }
    db::refresh_tokens::revoke_user(&state.pool, id).await?;

    audit::log_event(
        &state.pool,
        None,
        Some(auth.user_id),
        "user.deactivated",
        "user",
        Some(id),
        None,
    )
    .await;

    Ok(Json(json!({ "message": "Deactivated" })))
}

// --- Batches ---

#[derive(Serialize)]
pub struct BatchQueue {
    pub items: Vec<BatchWithTenant>,
    pub total: i64,
    pub pending: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Serialize)]
pub struct BatchDetail {
    pub batch: BatchWithTenant,
    pub history: Vec<AuditEvent>,
}

pub(crate) async fn batch_queue(state: &SharedState, auth: &AuthUser, page: i64) -> Result<BatchQueue, AppError> {
    auth.require_superuser(&state.access)?;
    let items = db::batches::list_all(
        &state.pool,
        BATCHES_PER_PAGE,
        (page - 1) * BATCHES_PER_PAGE,
    )
    .await?;
    Ok(BatchQueue {
        items,
        total: db::batches::count_all(&state.pool).await?,
        pending: db::batches::count_pending(&state.pool).await?,
        page,
        per_page: BATCHES_PER_PAGE,
    })
}

pub(crate) async fn batch_detail(state: &SharedState, auth: &AuthUser, id: Uuid) -> Result<BatchDetail, AppError> {
    auth.require_superuser(&state.access)?;
    let batch = db::batches::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| state.access.not_found("Batch"))?;
    let history = db::audit::list_for_resource(&state.pool, "batch", id).await?;
    Ok(BatchDetail { batch, history })
}

/// Apply a back-office decision to a lot: new status, optional notes and
/// result document. Final statuses notify the requester by email.
pub(crate) async fn process(
    state: &SharedState,
    auth: &AuthUser,
    id: Uuid,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Batch, AppError> {
    auth.require_superuser(&state.access)?;

    let existing = db::batches::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| state.access.not_found("Batch"))?;

    let mut form = batch::parse_multipart(headers, body).await?;
    let status = form
        .field("status")
        .and_then(BatchStatus::parse)
        .ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.insert("status".to_string(), "Estado no válido".to_string());
            AppError::Validation(errors)
        })?;
    let notes = form.field("notes").map(str::to_string);

    let stored_result = match form.take_file("result_file") {
        Some(file) => {
            batch::validate_upload(&file, state.config.max_upload_size, batch::RESULT_EXTENSIONS)?;
            let path = storage::store(&state.config.upload_dir, "results", &file.file_name, &file.data).await?;
            Some((file.file_name, path.to_string_lossy().into_owned()))
        }
        None => None,
    };

    let outcome = db::batches::process(
        &state.pool,
        id,
        status,
        notes.as_deref(),
        stored_result.as_ref().map(|(n, p)| (n.as_str(), p.as_str())),
    )
    .await;

    let updated = match outcome {
        Ok(Some(updated)) => updated,
        failed => {
            if let Some((_, path)) = &stored_result {
                storage::remove(path).await;
            }
            return match failed {
                Err(e) => Err(e.into()),
                _ => Err(state.access.not_found("Batch")),
            };
        }
    };

    // a new result document replaces the previous one on disk
    if stored_result.is_some() {
        if let Some(previous) = existing.batch.result_path.as_deref() {
            storage::remove(previous).await;
        }
    }

    audit::log_event(
        &state.pool,
        Some(updated.tenant_id),
        Some(auth.user_id),
        "batch.processed",
        "batch",
        Some(updated.id),
        Some(json!({
            "from": existing.batch.status,
            "to": updated.status,
            "result_attached": stored_result.is_some(),
        })),
    )
    .await;

    if status.is_final() {
        notify_requester(state, &existing, &updated);
    }

    tracing::info!(batch_id = %updated.id, status = status.as_str(), "Batch processed");
    Ok(updated)
}

fn notify_requester(state: &SharedState, existing: &BatchWithTenant, updated: &Batch) {
    let (Some(mailer), Some(email)) = (state.system_mailer.clone(), existing.requester_email.clone()) else {
        return;
    };
    let name = existing.requester_name.clone().unwrap_or_default();
    let base_url = state.config.base_url.clone();
    let batch = updated.clone();

    tokio::spawn(async move {
        if let Err(e) = mailer.send_batch_processed(&email, &name, &batch, &base_url).await {
            tracing::error!(batch_id = %batch.id, "Failed to send batch notice: {e}");
        }
    });
}

pub async fn list_batches(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<TenantQuery>,
) -> Result<Json<BatchQueue>, AppError> {
    Ok(Json(batch_queue(&state, &auth, q.page()).await?))
}

pub async fn get_batch(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchDetail>, AppError> {
    Ok(Json(batch_detail(&state, &auth, id).await?))
}

pub async fn process_batch(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Batch>, AppError> {
    Ok(Json(process(&state, &auth, id, &headers, body).await?))
}

pub async fn download_file(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_superuser(&state.access)?;
    let found = db::batches::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| state.access.not_found("Batch"))?;
    let data = storage::read(&found.batch.file_path).await?;
    Ok(batch::attachment(data, &found.batch.file_name))
}

pub async fn download_result(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_superuser(&state.access)?;
    let found = db::batches::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| state.access.not_found("Batch"))?;
    let (Some(name), Some(path)) = (&found.batch.result_file_name, &found.batch.result_path) else {
        return Err(state.access.not_found("Result"));
    };
    let data = storage::read(path).await?;
    Ok(batch::attachment(data, name))
}

fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
