use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use screener::config::{Config, ScreeningApiConfig};
use screener::report::{PdfRenderer, RenderError};
use screener::screening::{RawRecord, ScreeningClient, ScreeningError, ScreeningQuery};
use screener::state::Collaborators;

/// Provider stand-in. Answers with whatever the test scripted last.
pub struct FakeScreening {
    answer: Mutex<Result<Option<Vec<Value>>, String>>,
    pub queries: Mutex<Vec<ScreeningQuery>>,
}

impl FakeScreening {
    fn new() -> Self {
        Self {
            answer: Mutex::new(Ok(Some(Vec::new()))),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Provider items in its own wire shape.
    pub fn answer_with(&self, items: Vec<Value>) {
        *self.answer.lock().unwrap() = Ok(Some(items));
    }

    pub fn answer_nothing(&self) {
        *self.answer.lock().unwrap() = Ok(None);
    }

    pub fn fail(&self) {
        *self.answer.lock().unwrap() = Err("connection reset".to_string());
    }

    pub fn last_query(&self) -> Option<ScreeningQuery> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ScreeningClient for FakeScreening {
    async fn query(&self, query: &ScreeningQuery) -> Result<Option<Vec<RawRecord>>, ScreeningError> {
        self.queries.lock().unwrap().push(query.clone());
        let answer = self.answer.lock().unwrap().clone();
        match answer {
            Ok(Some(items)) => items
                .into_iter()
                .map(|v| serde_json::from_value(v).map_err(|e| ScreeningError::Decode(e.to_string())))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(ScreeningError::Transport(e)),
        }
    }
}

/// Renderer stand-in. Keeps the HTML it was handed.
pub struct FakePdf {
    pub rendered: Mutex<Vec<String>>,
}

#[async_trait]
impl PdfRenderer for FakePdf {
    async fn render(&self, html: &str, _base_url: &str) -> Result<Vec<u8>, RenderError> {
        self.rendered.lock().unwrap().push(html.to_string());
        Ok(b"%PDF-1.4 test".to_vec())
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub upload_dir: PathBuf,
    pub screening: Arc<FakeScreening>,
    pub pdf: Arc<FakePdf>,
}

pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const PASSWORD: &str = "password123";

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register the bootstrap user (first user = superuser without a tenant).
    pub async fn register(&self, email: &str, password: &str, name: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "email": email, "password": password, "name": name }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Login and return the auth response body + status.
    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register the bootstrap superuser, return its access token.
    pub async fn bootstrap(&self) -> String {
        let (body, status) = self.register(ADMIN_EMAIL, PASSWORD, "Admin").await;
        assert_eq!(status, StatusCode::OK, "bootstrap register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Create a tenant as superuser, return the tenant JSON.
    pub async fn create_tenant(&self, admin: &str, name: &str) -> Value {
        let (body, status) = self
            .post_auth("/api/v1/admin/tenants", admin, &json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::OK, "create tenant failed: {body}");
        body
    }

    /// Create a user as superuser, return the user JSON.
    pub async fn create_user(
        &self,
        admin: &str,
        tenant_id: Option<&str>,
        email: &str,
        is_superior: bool,
    ) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/admin/users",
                admin,
                &json!({
                    "tenant_id": tenant_id,
                    "email": email,
                    "password": PASSWORD,
                    "name": email.split('@').next().unwrap_or(email),
                    "is_superior": is_superior,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create user failed: {body}");
        body
    }

    /// Create a user and log them in, return their access token.
    pub async fn user_token(
        &self,
        admin: &str,
        tenant_id: Option<&str>,
        email: &str,
        is_superior: bool,
    ) -> String {
        self.create_user(admin, tenant_id, email, is_superior).await;
        let (body, status) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Run a search through the API, return (body, status).
    pub async fn search(&self, token: &str, body: &Value) -> (Value, StatusCode) {
        self.post_auth("/api/v1/searches", token, body).await
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Authenticated GET that keeps the raw response (downloads, PDFs).
    pub async fn get_raw(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed")
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated multipart POST request.
    pub async fn post_multipart(
        &self,
        path: &str,
        token: &str,
        form: reqwest::multipart::Form,
    ) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("multipart request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// A provider item in the provider's field naming.
pub fn hit(name: &str, list_type: &str, restrictive: bool) -> Value {
    json!({
        "NombreCompleto": name,
        "Id": "123",
        "Tipo_Lista": list_type,
        "Origen_Lista": "Internacional",
        "Fuente": "Fuente de prueba",
        "Restrictiva": restrictive,
        "Boletin": false,
        "CoincidenciaNombre": 100,
        "CoincidenciaID": 100,
    })
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!("screener_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    // Connect to test DB and run migrations
    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let upload_dir = std::env::temp_dir().join(&db_name);

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:0".to_string(),
        max_body_size: 1_048_576,
        max_upload_size: 1_048_576,
        upload_dir: upload_dir.clone(),
        mask_denials: true,
        search_rate_limit: 1000,
        log_level: "warn".to_string(),
        screening: ScreeningApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            token: None,
            timeout_secs: 1,
        },
        pdf_renderer_url: "http://127.0.0.1:9".to_string(),
        smtp: None,
    };

    let screening = Arc::new(FakeScreening::new());
    let pdf = Arc::new(FakePdf {
        rendered: Mutex::new(Vec::new()),
    });
    let collaborators = Collaborators {
        screening: screening.clone(),
        pdf: pdf.clone(),
    };

    let state = screener::build_state(pool.clone(), config, collaborators);
    let app = screener::build_app(state);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        upload_dir,
        screening,
        pdf,
    }
}

/// Drop stale test databases (useful after test crashes).
#[allow(dead_code)]
pub async fn cleanup_stale_test_dbs() {
    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    if let Ok(admin_pool) = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
    {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT datname FROM pg_database WHERE datname LIKE 'screener_test_%'",
        )
        .fetch_all(&admin_pool)
        .await
        .unwrap_or_default();

        for db_name in rows {
            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
                .execute(&admin_pool)
                .await;
        }
        admin_pool.close().await;
    }
}

/// Drop the test database and uploaded files after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;
    let _ = tokio::fs::remove_dir_all(&app.upload_dir).await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
