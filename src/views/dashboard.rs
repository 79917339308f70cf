use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use chrono::Utc;
use serde_json::json;

use super::{nav, script_json, Nav};
use crate::analytics::dashboard::{self, Overview};
use crate::analytics::{Window, WINDOW_DAYS};
use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "dashboard/index.html")]
struct DashboardTemplate {
    nav: Nav,
    overview: Overview,
    chart_json: String,
    detail_path: &'static str,
}

/// Chart.js inputs for the overview charts.
pub(crate) fn overview_chart(overview: &Overview) -> String {
    script_json(&json!({
        "labels": overview.daily.labels,
        "searches": overview.daily.searches,
        "red": overview.daily.red,
        "tiers": [overview.tiers.red, overview.tiers.amber, overview.tiers.pep],
        "sources": overview.top_red_sources.iter().map(|s| &s.source).collect::<Vec<_>>(),
        "source_hits": overview.top_red_sources.iter().map(|s| s.hits).collect::<Vec<_>>(),
    }))
}

pub async fn index(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let window = Window::trailing_days(Utc::now(), WINDOW_DAYS);
    let overview = dashboard::personal(&state.pool, &auth.own_scope(), &window).await?;

    let template = DashboardTemplate {
        nav: nav(&state, &auth).await?,
        chart_json: overview_chart(&overview),
        overview,
        detail_path: "/history",
    };
    Ok(Html(template.render().unwrap_or_default()))
}
