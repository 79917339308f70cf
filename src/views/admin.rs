use askama::Template;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde_json::json;
use uuid::Uuid;

use super::batches::BatchRow;
use super::dashboard::overview_chart;
use super::{nav, script_json, Nav};
use crate::analytics::dashboard::{MonthlyReport, Overview, PlatformDashboard};
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::stats::{PlatformTotals, UserVolume};
use crate::error::{AppError, FieldErrors};
use crate::models::{AuditEvent, BatchStatus, Tenant, TenantWithCounts, User};
use crate::routes::admin::{self, BatchQueue, TenantQuery};
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct PlatformTemplate {
    nav: Nav,
    overview: Overview,
    totals: PlatformTotals,
    tenants: Vec<TenantWithCounts>,
    selected_tenant: String,
    top_users: Vec<UserVolume>,
    chart_json: String,
    monthly_json: String,
    detail_path: &'static str,
}

#[derive(Template)]
#[template(path = "admin/batches.html")]
struct BatchesTemplate<'a> {
    nav: Nav,
    queue: &'a BatchQueue,
    rows: Vec<(BatchRow<'a>, &'a str)>,
    total_pages: i64,
}

#[derive(Template)]
#[template(path = "admin/batch.html")]
struct BatchTemplate<'a> {
    nav: Nav,
    row: BatchRow<'a>,
    tenant_name: &'a str,
    requester: String,
    history: &'a [AuditEvent],
    statuses: Vec<StatusOption>,
    errors: FieldErrors,
}

/// One entry of the status picker on the processing form.
struct StatusOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Template)]
#[template(path = "admin/monthly.html")]
struct MonthlyTemplate {
    nav: Nav,
    report: MonthlyReport,
    tenants: Vec<Tenant>,
    selected_tenant: String,
    chart_json: String,
}

#[derive(Template)]
#[template(path = "admin/tenants.html")]
struct TenantsTemplate {
    nav: Nav,
    tenants: Vec<TenantWithCounts>,
}

#[derive(Template)]
#[template(path = "admin/users.html")]
struct UsersTemplate {
    nav: Nav,
    users: Vec<(User, String)>,
    tenants: Vec<Tenant>,
    selected_tenant: String,
    current_user_id: Uuid,
}

pub async fn dashboard_page(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<TenantQuery>,
) -> Result<impl IntoResponse, AppError> {
    let PlatformDashboard {
        overview,
        totals,
        monthly,
        tenants,
        selected_tenant,
        top_users,
    } = admin::platform_dashboard(&state, &auth, &q).await?;

    let monthly_json = script_json(&json!({
        "labels": monthly.iter().map(|m| &m.month).collect::<Vec<_>>(),
        "searches": monthly.iter().map(|m| m.searches).collect::<Vec<_>>(),
    }));

    let template = PlatformTemplate {
        nav: nav(&state, &auth).await?,
        chart_json: overview_chart(&overview),
        overview,
        totals,
        tenants,
        selected_tenant: selected_tenant.map(|id| id.to_string()).unwrap_or_default(),
        top_users,
        monthly_json,
        detail_path: "",
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn batches_page(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<TenantQuery>,
) -> Result<impl IntoResponse, AppError> {
    let queue = admin::batch_queue(&state, &auth, q.page()).await?;
    let total_pages = ((queue.total + queue.per_page - 1) / queue.per_page).max(1);

    let template = BatchesTemplate {
        nav: nav(&state, &auth).await?,
        rows: queue
            .items
            .iter()
            .map(|b| (BatchRow::new(&b.batch), b.tenant_name.as_str()))
            .collect(),
        queue: &queue,
        total_pages,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

async fn render_batch(
    state: &SharedState,
    auth: &AuthUser,
    id: Uuid,
    status: StatusCode,
    errors: FieldErrors,
) -> Result<Response, AppError> {
    let detail = admin::batch_detail(state, auth, id).await?;
    let requester = match (&detail.batch.requester_name, &detail.batch.requester_email) {
        (Some(name), Some(email)) => format!("{name} <{email}>"),
        _ => "Usuario eliminado".to_string(),
    };

    let template = BatchTemplate {
        nav: nav(state, auth).await?,
        row: BatchRow::new(&detail.batch.batch),
        tenant_name: &detail.batch.tenant_name,
        requester,
        history: &detail.history,
        statuses: [
            BatchStatus::Pending,
            BatchStatus::Processing,
            BatchStatus::Completed,
            BatchStatus::Rejected,
        ]
        .iter()
        .map(|s| StatusOption {
            value: s.as_str(),
            label: s.label(),
            selected: detail.batch.batch.status == s.as_str(),
        })
        .collect(),
        errors,
    };
    Ok((status, Html(template.render().unwrap_or_default())).into_response())
}

pub async fn batch_page(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    render_batch(&state, &auth, id, StatusCode::OK, FieldErrors::new()).await
}

pub async fn process_submit(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    match admin::process(&state, &auth, id, &headers, body).await {
        Ok(_) => Ok(Redirect::to(&format!("/admin/batches/{id}")).into_response()),
        Err(AppError::Validation(errors)) => {
            render_batch(&state, &auth, id, StatusCode::UNPROCESSABLE_ENTITY, errors).await
        }
        Err(e) => Err(e),
    }
}

pub async fn monthly_page(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<TenantQuery>,
) -> Result<impl IntoResponse, AppError> {
    let report = admin::monthly(&state, &auth, &q).await?;
    let tenants = db::tenants::list(&state.pool).await?;

    let template = MonthlyTemplate {
        nav: nav(&state, &auth).await?,
        chart_json: script_json(&json!({ "labels": report.labels, "counts": report.counts })),
        selected_tenant: report.tenant_id.map(|id| id.to_string()).unwrap_or_default(),
        report,
        tenants,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn tenants_page(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_superuser(&state.access)?;

    let template = TenantsTemplate {
        nav: nav(&state, &auth).await?,
        tenants: db::tenants::list_with_counts(&state.pool).await?,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn users_page(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<TenantQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_superuser(&state.access)?;

    let tenants = db::tenants::list(&state.pool).await?;
    let users = db::users::list_all(&state.pool, q.tenant_id())
        .await?
        .into_iter()
        .map(|u| {
            let tenant_name = u
                .tenant_id
                .and_then(|id| tenants.iter().find(|t| t.id == id))
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "-".to_string());
            (u, tenant_name)
        })
        .collect();

    let template = UsersTemplate {
        nav: nav(&state, &auth).await?,
        users,
        tenants,
        selected_tenant: q.tenant_id().map(|id| id.to_string()).unwrap_or_default(),
        current_user_id: auth.user_id,
    };
    Ok(Html(template.render().unwrap_or_default()))
}
