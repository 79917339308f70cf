use axum::extract::State;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::auth::tokens::{self, IssuedTokens, REFRESH_COOKIE};
use crate::db;
use crate::error::{conflict_on_unique, AppError};
use crate::middleware::audit;
use crate::models::User;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create the first account of a fresh installation. It becomes a platform
/// superuser without a tenant; every later account is created from the back-office.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<IssuedTokens>), AppError> {
    let email = req.email.trim();
    let name = req.name.trim();
    if email.is_empty() || req.password.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    password::check_strength(&req.password)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    // Advisory lock prevents concurrent bootstrap registrations
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let count = db::users::count_all(&mut *tx).await?;
    if count > 0 {
        return Err(AppError::Forbidden(
            "Registration is disabled. Contact your system administrator.".to_string(),
        ));
    }

    let user = db::users::create(
        &mut *tx,
        &db::users::NewUser {
            tenant_id: None,
            email,
            password_hash: &pw_hash,
            name,
            is_superior: false,
            is_superuser: true,
        },
    )
    .await
    .map_err(|e| conflict_on_unique(e, "Email already registered"))?;

    tx.commit().await?;

    let issued = tokens::issue(&state.pool, &user, &state.config.jwt_secret).await?;

    audit::log_event(
        &state.pool,
        None,
        Some(user.id),
        "user.registered",
        "user",
        Some(user.id),
        None,
    )
    .await;

    tracing::info!(user_id = %user.id, "Bootstrap superuser registered");

    Ok((issued.cookies(), Json(issued)))
}

/// Check credentials, applying the login limiter. Shared with the HTML login form.
pub(crate) async fn authenticate(
    state: &SharedState,
    email: &str,
    pass: &str,
) -> Result<User, AppError> {
    if state.login_limiter.check(email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let Some(user) = db::users::find_by_email(&state.pool, email).await? else {
        state.login_limiter.record_failure(email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    let valid = password::verify(pass, &user.password_hash).map_err(AppError::Internal)?;
    if !valid || !user.is_active {
        state.login_limiter.record_failure(email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    audit::log_event(
        &state.pool,
        user.tenant_id,
        Some(user.id),
        "user.login",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok(user)
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<IssuedTokens>), AppError> {
    let user = authenticate(&state, &req.email, &req.password).await?;
    let issued = tokens::issue(&state.pool, &user, &state.config.jwt_secret).await?;
    Ok((issued.cookies(), Json(issued)))
}

pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<IssuedTokens>), AppError> {
    let refresh_value = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let (user, issued) = tokens::rotate(&state.pool, &refresh_value, &state.config.jwt_secret).await?;
    tracing::debug!(user_id = %user.id, "Session refreshed");
    Ok((issued.cookies(), Json(issued)))
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        db::refresh_tokens::revoke(&state.pool, &tokens::hash_token(cookie.value()))
            .await?;
    }

    Ok((
        tokens::clear_cookies(),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

pub async fn change_password(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<(CookieJar, Json<IssuedTokens>), AppError> {
    password::check_strength(&req.new_password)?;

    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let valid = password::verify(&req.current_password, &user.password_hash)
        .map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.new_password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;

    // Every other session goes
    db::refresh_tokens::revoke_user(&state.pool, user.id).await?;

    let issued = tokens::issue(&state.pool, &user, &state.config.jwt_secret).await?;

    audit::log_event(
        &state.pool,
        user.tenant_id,
        Some(user.id),
        "user.password_changed",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok((issued.cookies(), Json(issued)))
}

pub async fn me(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
    Ok(Json(user))
}
