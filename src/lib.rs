pub mod access;
pub mod analytics;
pub mod auth;
pub mod batch;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod report;
pub mod routes;
pub mod screening;
pub mod state;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::access::AccessPolicy;
use crate::config::Config;
use crate::email::SystemMailer;
use crate::middleware::auth_redirect::redirect_unauthorized;
use crate::rate_limit::{LoginRateLimiter, SearchRateLimiter};
use crate::state::{AppState, Collaborators, SharedState};

pub fn build_state(pool: PgPool, config: Config, collaborators: Collaborators) -> SharedState {
    let system_mailer = config.smtp.as_ref().and_then(|smtp| {
        match SystemMailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!("System SMTP configured");
                Some(Arc::new(mailer))
            }
            Err(e) => {
                tracing::warn!("System SMTP not available: {e}");
                None
            }
        }
    });

    Arc::new(AppState {
        pool,
        access: AccessPolicy::new(config.mask_denials),
        search_limiter: SearchRateLimiter::new(config.search_rate_limit),
        config,
        screening: collaborators.screening,
        pdf: collaborators.pdf,
        system_mailer,
        login_limiter: LoginRateLimiter::new(),
    })
}

pub fn build_app(state: SharedState) -> Router {
    // Uploads are the largest bodies we accept
    let body_limit = state.config.max_upload_size.max(state.config.max_body_size) + 64 * 1024;

    Router::new()
        .merge(routes::api_routes())
        .merge(views::view_routes().layer(axum::middleware::from_fn(redirect_unauthorized)))
        .nest_service("/static", ServeDir::new("static"))
        .route("/health", axum::routing::get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

/// Periodic housekeeping: stale limiter windows and expired refresh tokens.
pub async fn run_maintenance(state: SharedState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        state.login_limiter.cleanup(Duration::from_secs(15 * 60));
        state.search_limiter.cleanup(Duration::from_secs(60));
        match db::refresh_tokens::purge_expired(&state.pool).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(removed = n, "Expired refresh tokens removed"),
            Err(e) => tracing::warn!("Refresh token cleanup failed: {e}"),
        }
    }
}

async fn health() -> &'static str {
    "ok"
}
