use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use super::searches::{self, HistoryQuery, Page, SearchDetail};
use crate::analytics::dashboard::{self, TenantDashboard};
use crate::analytics::{Window, WINDOW_DAYS};
use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::models::SearchWithOwner;
use crate::state::SharedState;

pub async fn dashboard(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<TenantDashboard>, AppError> {
    let scope = auth.tenant_scope(&state.access)?;
    let tenant_id = auth.require_tenant(&state.access)?;
    let window = Window::trailing_days(Utc::now(), WINDOW_DAYS);
    Ok(Json(
        dashboard::tenant(&state.pool, &scope, tenant_id, &window).await?,
    ))
}

pub async fn list_searches(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Page<SearchWithOwner>>, AppError> {
    let scope = auth.tenant_scope(&state.access)?;
    Ok(Json(searches::list_page(&state, &scope, &q).await?))
}

pub async fn get_search(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SearchDetail>, AppError> {
    let scope = auth.tenant_scope(&state.access)?;
    Ok(Json(searches::load_detail(&state, &scope, id).await?))
}

pub async fn search_report(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let scope = auth.tenant_scope(&state.access)?;
    searches::pdf(&state, &scope, id).await
}
