pub mod admin;
pub mod auth;
pub mod batches;
pub mod dashboard;
pub mod manage;
pub mod searches;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/change-password", post(auth::change_password))
        .route("/api/v1/me", get(auth::me))
        // Searches
        .route("/api/v1/searches", get(searches::list).post(searches::create))
        .route("/api/v1/searches/{id}", get(searches::get))
        .route("/api/v1/searches/{id}/report", get(searches::report))
        .route("/api/v1/dashboard", get(dashboard::personal))
        // Tenant management
        .route("/api/v1/manage/dashboard", get(manage::dashboard))
        .route("/api/v1/manage/searches", get(manage::list_searches))
        .route("/api/v1/manage/searches/{id}", get(manage::get_search))
        .route("/api/v1/manage/searches/{id}/report", get(manage::search_report))
        // Batches
        .route("/api/v1/batches", get(batches::list).post(batches::create))
        .route("/api/v1/batches/{id}/result", get(batches::download_result))
        // Admin
        .route("/api/v1/admin/dashboard", get(admin::get_dashboard))
        .route("/api/v1/admin/reports/monthly", get(admin::monthly_report))
        .route(
            "/api/v1/admin/tenants",
            get(admin::list_tenants).post(admin::create_tenant),
        )
        .route(
            "/api/v1/admin/tenants/{id}",
            get(admin::get_tenant)
                .put(admin::update_tenant)
                .delete(admin::delete_tenant),
        )
        .route(
            "/api/v1/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route(
            "/api/v1/admin/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/api/v1/admin/batches", get(admin::list_batches))
        .route("/api/v1/admin/batches/{id}", get(admin::get_batch))
        .route("/api/v1/admin/batches/{id}/process", post(admin::process_batch))
        .route("/api/v1/admin/batches/{id}/file", get(admin::download_file))
        .route("/api/v1/admin/batches/{id}/result", get(admin::download_result))
}
