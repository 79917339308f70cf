use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::access::Scope;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::searches::SearchFilter;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Record, SearchWithOwner};
use crate::report;
use crate::screening::pipeline::{self, Requester, SearchOutcome};
use crate::screening::{input, ScreeningQuery};
use crate::state::SharedState;

pub const PER_PAGE: i64 = 20;

/// History filters as they arrive from a query string. Blank values mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub user_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub term: Option<String>,
    pub has_results: Option<String>,
}

impl HistoryQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * PER_PAGE
    }

    pub fn filter(&self) -> SearchFilter {
        SearchFilter {
            user_id: non_blank(&self.user_id).and_then(|s| s.parse::<Uuid>().ok()),
            date_from: non_blank(&self.date_from).and_then(parse_date),
            date_to: non_blank(&self.date_to).and_then(parse_date),
            term: non_blank(&self.term).map(str::to_string),
            has_results: non_blank(&self.has_results).and_then(|s| match s {
                "true" | "1" | "si" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            }),
            span: None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchDetail {
    pub search: SearchWithOwner,
    pub records: Vec<Record>,
}

/// Rate-limit, validate and run one screening for the caller.
pub(crate) async fn submit(
    state: &SharedState,
    auth: &AuthUser,
    query: &ScreeningQuery,
) -> Result<SearchOutcome, AppError> {
    if state.search_limiter.check(auth.user_id).is_err() {
        return Err(AppError::RateLimited(
            "Too many searches. Please wait a minute.".to_string(),
        ));
    }

    let requester = Requester {
        user_id: auth.user_id,
        tenant_id: auth.tenant_id,
    };
    let outcome = pipeline::run(&state.pool, state.screening.as_ref(), requester, query).await?;

    audit::log_event(
        &state.pool,
        auth.tenant_id,
        Some(auth.user_id),
        "search.created",
        "search",
        Some(outcome.search.id),
        Some(json!({
            "mode": query.path(),
            "records": outcome.records.len(),
            "alert": outcome.search.alert,
            "provider_error": outcome.provider_failed,
        })),
    )
    .await;

    Ok(outcome)
}

/// A search and its records inside `scope`, or not-found.
pub(crate) async fn load_detail(
    state: &SharedState,
    scope: &Scope,
    id: Uuid,
) -> Result<SearchDetail, AppError> {
    let search = db::searches::find_scoped(&state.pool, scope, id)
        .await?
        .ok_or_else(|| state.access.not_found("Search"))?;
    let records = db::records::list_for_search(&state.pool, search.id).await?;
    Ok(SearchDetail { search, records })
}

pub(crate) async fn list_page(
    state: &SharedState,
    scope: &Scope,
    q: &HistoryQuery,
) -> Result<Page<SearchWithOwner>, AppError> {
    let filter = q.filter();
    let items = db::searches::list(&state.pool, scope, &filter, PER_PAGE, q.offset()).await?;
    let total = db::searches::count(&state.pool, scope, &filter).await?;
    Ok(Page {
        items,
        total,
        page: q.page(),
        per_page: PER_PAGE,
    })
}

pub(crate) async fn pdf(
    state: &SharedState,
    scope: &Scope,
    id: Uuid,
) -> Result<Response, AppError> {
    let detail = load_detail(state, scope, id).await?;
    let bytes = report::build_pdf(
        state.pdf.as_ref(),
        &detail.search,
        &detail.records,
        &state.config.base_url,
    )
    .await?;
    Ok(report::pdf_response(bytes, &detail.search.term))
}

pub async fn create(
    State(state): State<SharedState>,
    auth: AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<SearchDetail>), AppError> {
    let content_type = headers.get("content-type").and_then(|v| v.to_str().ok());
    let raw = input::parse_body(content_type, &body)?;
    let query = input::validate(&raw)?;

    let outcome = submit(&state, &auth, &query).await?;
    let detail = load_detail(&state, &auth.own_scope(), outcome.search.id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Page<SearchWithOwner>>, AppError> {
    Ok(Json(list_page(&state, &auth.own_scope(), &q).await?))
}

pub async fn get(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SearchDetail>, AppError> {
    Ok(Json(load_detail(&state, &auth.own_scope(), id).await?))
}

pub async fn report(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    pdf(&state, &auth.own_scope(), id).await
}
