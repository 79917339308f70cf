pub mod admin;
pub mod auth;
pub mod batches;
pub mod dashboard;
pub mod manage;
pub mod search;

use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        // Auth views
        .route("/", get(auth::login_page))
        .route("/auth/login", get(auth::login_page).post(auth::login_submit))
        .route("/auth/logout", axum::routing::post(auth::logout))
        // Searches
        .route("/search", get(search::form_page).post(search::submit))
        .route("/history", get(search::history))
        .route("/history/{id}", get(search::detail))
        .route("/searches/{id}/report.pdf", get(search::report))
        .route("/dashboard", get(dashboard::index))
        // Tenant management
        .route("/manage", get(manage::index))
        .route("/manage/searches", get(manage::searches))
        .route("/manage/searches/{id}", get(manage::detail))
        .route("/manage/searches/{id}/report.pdf", get(manage::report))
        // Batches
        .route("/batches", get(batches::index).post(batches::upload))
        .route("/batches/{id}/result", get(batches::result))
        // Admin
        .route("/admin", get(admin::dashboard_page))
        .route("/admin/batches", get(admin::batches_page))
        .route(
            "/admin/batches/{id}",
            get(admin::batch_page).post(admin::process_submit),
        )
        .route("/admin/reports/monthly", get(admin::monthly_page))
        .route("/admin/tenants", get(admin::tenants_page))
        .route("/admin/users", get(admin::users_page))
}

/// What the navigation bar needs to know about the signed-in user.
pub struct Nav {
    pub user_name: String,
    pub is_superior: bool,
    pub is_superuser: bool,
    pub has_tenant: bool,
}

impl Nav {
    pub fn can_manage(&self) -> bool {
        (self.is_superior || self.is_superuser) && self.has_tenant
    }
}

/// Load the navigation context. Deactivated accounts are sent back to the login page.
pub(crate) async fn nav(state: &SharedState, auth: &AuthUser) -> Result<Nav, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Account inactive".to_string()))?;

    Ok(Nav {
        user_name: user.name,
        is_superior: user.is_superior,
        is_superuser: user.is_superuser,
        has_tenant: user.tenant_id.is_some(),
    })
}

/// Serialize chart data for embedding in a `<script>` block.
pub(crate) fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}
