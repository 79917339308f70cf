use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use chrono::Utc;
use uuid::Uuid;

use super::dashboard::overview_chart;
use super::search::{DetailTemplate, HistoryTemplate};
use super::{nav, Nav};
use crate::analytics::dashboard::{self, Overview, TenantDashboard};
use crate::analytics::{Window, WINDOW_DAYS};
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::stats::UserVolume;
use crate::error::AppError;
use crate::routes::searches::{self, HistoryQuery};
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "manage/dashboard.html")]
struct ManageTemplate {
    nav: Nav,
    overview: Overview,
    active_users: i64,
    top_users: Vec<UserVolume>,
    chart_json: String,
    detail_path: &'static str,
}

pub async fn index(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let scope = auth.tenant_scope(&state.access)?;
    let tenant_id = auth.require_tenant(&state.access)?;
    let window = Window::trailing_days(Utc::now(), WINDOW_DAYS);
    let TenantDashboard {
        overview,
        active_users,
        top_users,
    } = dashboard::tenant(&state.pool, &scope, tenant_id, &window).await?;

    let template = ManageTemplate {
        nav: nav(&state, &auth).await?,
        chart_json: overview_chart(&overview),
        overview,
        active_users,
        top_users,
        detail_path: "/manage/searches",
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn searches(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let scope = auth.tenant_scope(&state.access)?;
    let tenant_id = auth.require_tenant(&state.access)?;

    let page = searches::list_page(&state, &scope, &q).await?;
    let users = db::users::list_active_by_tenant(&state.pool, tenant_id).await?;

    let template = HistoryTemplate::new(
        nav(&state, &auth).await?,
        "Consultas de la empresa",
        "/manage/searches",
        page,
        &q,
        users,
    );
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn detail(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let scope = auth.tenant_scope(&state.access)?;
    let detail = searches::load_detail(&state, &scope, id).await?;
    let template = DetailTemplate::new(nav(&state, &auth).await?, &detail, "/manage/searches", true);
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn report(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let scope = auth.tenant_scope(&state.access)?;
    searches::pdf(&state, &scope, id).await
}
