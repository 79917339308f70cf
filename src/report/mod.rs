//! Printable search reports.

pub mod renderer;

use askama::Template;
use async_trait::async_trait;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{Record, SearchWithOwner};
use crate::screening::Classification;

pub use renderer::HttpPdfRenderer;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer unreachable: {0}")]
    Transport(String),
    #[error("renderer answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Turns an HTML document into PDF bytes. `base_url` resolves relative assets.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, base_url: &str) -> Result<Vec<u8>, RenderError>;
}

/// A record row as printed, with its tier resolved for styling.
pub struct ReportRow<'a> {
    pub record: &'a Record,
    pub tier: Classification,
}

#[derive(Template)]
#[template(path = "search/report.html")]
struct ReportTemplate<'a> {
    search: &'a SearchWithOwner,
    rows: Vec<ReportRow<'a>>,
    generated_at: String,
    base_url: &'a str,
}

pub fn render_html(
    search: &SearchWithOwner,
    records: &[Record],
    base_url: &str,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let rows = records
        .iter()
        .map(|record| ReportRow {
            record,
            tier: Classification::from_label(&record.classification),
        })
        .collect();

    ReportTemplate {
        search,
        rows,
        generated_at: now.format("%Y-%m-%d %H:%M UTC").to_string(),
        base_url,
    }
    .render()
    .map_err(|e| AppError::Internal(format!("Report template failed: {e}")))
}

/// Render the report and convert it through `renderer`. Renderer failures are
/// request failures; there is no fallback document.
pub async fn build_pdf(
    renderer: &dyn PdfRenderer,
    search: &SearchWithOwner,
    records: &[Record],
    base_url: &str,
) -> Result<Vec<u8>, AppError> {
    let html = render_html(search, records, base_url, Utc::now())?;
    renderer.render(&html, base_url).await.map_err(|e| {
        tracing::error!(search_id = %search.id, "PDF rendering failed: {e}");
        AppError::Internal(format!("PDF rendering failed: {e}"))
    })
}

/// `Reporte-LAFT-{term}.pdf` with the term reduced to printable ASCII and no quotes.
pub fn filename(term: &str) -> String {
    let cleaned: String = term
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| !matches!(c, '"' | '\'' | '\\' | '/' | ';'))
        .collect();
    format!("Reporte-LAFT-{}.pdf", cleaned.trim())
}

pub fn pdf_response(bytes: Vec<u8>, term: &str) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename(term));
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}
