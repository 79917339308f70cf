use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub max_body_size: usize,
    pub max_upload_size: usize,
    pub upload_dir: PathBuf,
    pub mask_denials: bool,
    pub search_rate_limit: u32,
    pub log_level: String,
    pub screening: ScreeningApiConfig,
    pub pdf_renderer_url: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct ScreeningApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("SCREENER_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SCREENER_HOST: {e}"))?;

        let port: u16 = env_or("SCREENER_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid SCREENER_PORT: {e}"))?;

        let base_url = env_or("SCREENER_BASE_URL", &format!("http://{host}:{port}"));

        let max_body_size: usize = env_or("SCREENER_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid SCREENER_MAX_BODY_SIZE: {e}"))?;

        let max_upload_size: usize = env_or("SCREENER_MAX_UPLOAD_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid SCREENER_MAX_UPLOAD_SIZE: {e}"))?;

        let upload_dir = PathBuf::from(env_or("SCREENER_UPLOAD_DIR", "uploads"));

        let mask_denials = parse_bool("SCREENER_MASK_DENIALS", &env_or("SCREENER_MASK_DENIALS", "true"))?;

        let search_rate_limit: u32 = env_or("SCREENER_SEARCH_RATE_LIMIT", "30")
            .parse()
            .map_err(|e| format!("Invalid SCREENER_SEARCH_RATE_LIMIT: {e}"))?;

        let log_level = env_or("SCREENER_LOG_LEVEL", "info");

        let screening = ScreeningApiConfig {
            base_url: env_required("SCREENING_API_URL")?,
            token: std::env::var("SCREENING_API_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            timeout_secs: env_or("SCREENING_API_TIMEOUT_SECS", "30")
                .parse()
                .map_err(|e| format!("Invalid SCREENING_API_TIMEOUT_SECS: {e}"))?,
        };

        let pdf_renderer_url = env_required("PDF_RENDERER_URL")?;

        let smtp = match (
            std::env::var("SCREENER_SMTP_HOST").ok(),
            std::env::var("SCREENER_SMTP_PORT").ok(),
            std::env::var("SCREENER_SMTP_USER").ok(),
            std::env::var("SCREENER_SMTP_PASS").ok(),
            std::env::var("SCREENER_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid SCREENER_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            base_url,
            max_body_size,
            max_upload_size,
            upload_dir,
            mask_denials,
            search_rate_limit,
            log_level,
            screening,
            pdf_renderer_url,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("Invalid {key}: '{other}' is not a boolean")),
    }
}
