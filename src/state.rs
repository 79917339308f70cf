use std::sync::Arc;

use sqlx::PgPool;

use crate::access::AccessPolicy;
use crate::config::Config;
use crate::email::SystemMailer;
use crate::rate_limit::{LoginRateLimiter, SearchRateLimiter};
use crate::report::PdfRenderer;
use crate::screening::ScreeningClient;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub access: AccessPolicy,
    pub screening: Arc<dyn ScreeningClient>,
    pub pdf: Arc<dyn PdfRenderer>,
    pub system_mailer: Option<Arc<SystemMailer>>,
    pub login_limiter: LoginRateLimiter,
    pub search_limiter: SearchRateLimiter,
}

/// The external services the app talks to. Swapped for fakes in tests.
#[derive(Clone)]
pub struct Collaborators {
    pub screening: Arc<dyn ScreeningClient>,
    pub pdf: Arc<dyn PdfRenderer>,
}

impl Collaborators {
    /// HTTP clients for the configured provider and renderer.
    pub fn from_config(config: &Config) -> Result<Self, String> {
        Ok(Self {
            screening: Arc::new(crate::screening::client::HttpScreeningClient::new(
                &config.screening,
            )?),
            pdf: Arc::new(crate::report::HttpPdfRenderer::new(&config.pdf_renderer_url)?),
        })
    }
}
