use askama::Template;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use uuid::Uuid;

use super::{nav, Nav};
use crate::auth::extractor::AuthUser;
use crate::error::{AppError, FieldErrors};
use crate::models::{SearchWithOwner, User};
use crate::report::ReportRow;
use crate::routes::searches::{self, HistoryQuery, Page, SearchDetail};
use crate::screening::{input, Classification};
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "search/form.html")]
struct SearchFormTemplate {
    nav: Nav,
    identification: String,
    name: String,
    errors: FieldErrors,
    message: Option<String>,
}

#[derive(Template)]
#[template(path = "search/history.html")]
pub(crate) struct HistoryTemplate {
    pub nav: Nav,
    pub title: String,
    /// `/history` or `/manage/searches`; detail links hang off it.
    pub base_path: String,
    pub page: Page<SearchWithOwner>,
    pub total_pages: i64,
    pub filters_qs: String,
    pub term: String,
    pub date_from: String,
    pub date_to: String,
    pub has_results: String,
    pub user_id: String,
    /// Owner filter choices. Empty on a personal history.
    pub users: Vec<User>,
}

impl HistoryTemplate {
    pub(crate) fn new(
        nav: Nav,
        title: &str,
        base_path: &str,
        page: Page<SearchWithOwner>,
        q: &HistoryQuery,
        users: Vec<User>,
    ) -> Self {
        let total_pages = ((page.total + page.per_page - 1) / page.per_page).max(1);
        let echo = |v: &Option<String>| v.clone().unwrap_or_default();

        let mut qs = form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("term", &q.term),
            ("date_from", &q.date_from),
            ("date_to", &q.date_to),
            ("has_results", &q.has_results),
            ("user_id", &q.user_id),
        ] {
            if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                qs.append_pair(key, v);
            }
        }

        HistoryTemplate {
            nav,
            title: title.to_string(),
            base_path: base_path.to_string(),
            page,
            total_pages,
            filters_qs: qs.finish(),
            term: echo(&q.term),
            date_from: echo(&q.date_from),
            date_to: echo(&q.date_to),
            has_results: echo(&q.has_results),
            user_id: echo(&q.user_id),
            users,
        }
    }
}

#[derive(Template)]
#[template(path = "search/detail.html")]
pub(crate) struct DetailTemplate<'a> {
    pub nav: Nav,
    pub search: &'a SearchWithOwner,
    pub rows: Vec<ReportRow<'a>>,
    pub back_url: &'a str,
    pub pdf_url: String,
    pub show_owner: bool,
}

impl<'a> DetailTemplate<'a> {
    pub(crate) fn new(nav: Nav, detail: &'a SearchDetail, back_url: &'a str, show_owner: bool) -> Self {
        let pdf_url = if show_owner {
            format!("/manage/searches/{}/report.pdf", detail.search.id)
        } else {
            format!("/searches/{}/report.pdf", detail.search.id)
        };
        DetailTemplate {
            nav,
            search: &detail.search,
            rows: detail
                .records
                .iter()
                .map(|record| ReportRow {
                    record,
                    tier: Classification::from_label(&record.classification),
                })
                .collect(),
            back_url,
            pdf_url,
            show_owner,
        }
    }
}

pub async fn form_page(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let template = SearchFormTemplate {
        nav: nav(&state, &auth).await?,
        identification: String::new(),
        name: String::new(),
        errors: FieldErrors::new(),
        message: None,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

/// Validate and run a search from the HTML form. Invalid input redisplays the
/// form with the messages next to each field.
pub async fn submit(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers.get("content-type").and_then(|v| v.to_str().ok());
    let raw = input::parse_body(content_type, &body)?;
    let echo = |key: &str| raw.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string();

    let redisplay = |status: StatusCode, errors: FieldErrors, message: Option<String>, nav: Nav| {
        let template = SearchFormTemplate {
            nav,
            identification: echo("identification"),
            name: echo("name"),
            errors,
            message,
        };
        (status, Html(template.render().unwrap_or_default())).into_response()
    };

    let query = match input::validate(&raw) {
        Ok(query) => query,
        Err(AppError::Validation(errors)) => {
            let nav = nav(&state, &auth).await?;
            return Ok(redisplay(StatusCode::UNPROCESSABLE_ENTITY, errors, None, nav));
        }
        Err(e) => return Err(e),
    };

    match searches::submit(&state, &auth, &query).await {
        Ok(outcome) => Ok(Redirect::to(&format!("/history/{}", outcome.search.id)).into_response()),
        Err(AppError::RateLimited(_)) => {
            let nav = nav(&state, &auth).await?;
            Ok(redisplay(
                StatusCode::TOO_MANY_REQUESTS,
                FieldErrors::new(),
                Some("Demasiadas consultas. Espere un minuto.".to_string()),
                nav,
            ))
        }
        Err(e) => Err(e),
    }
}

pub async fn history(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = searches::list_page(&state, &auth.own_scope(), &q).await?;
    let template = HistoryTemplate::new(
        nav(&state, &auth).await?,
        "Historial de consultas",
        "/history",
        page,
        &q,
        Vec::new(),
    );
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn detail(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = searches::load_detail(&state, &auth.own_scope(), id).await?;
    let template = DetailTemplate::new(nav(&state, &auth).await?, &detail, "/history", false);
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn report(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    searches::pdf(&state, &auth.own_scope(), id).await
}
