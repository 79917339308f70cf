use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::auth::jwt::{self, Claims};
use crate::db;
use crate::error::AppError;
use crate::models::User;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const REFRESH_TTL_DAYS: i64 = 7;

#[derive(Debug, serde::Serialize)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl IssuedTokens {
    pub fn cookies(&self) -> CookieJar {
        let access = Cookie::build((ACCESS_COOKIE, self.access_token.clone()))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::minutes(jwt::ACCESS_TTL_MINUTES))
            .build();

        let refresh = Cookie::build((REFRESH_COOKIE, self.refresh_token.clone()))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::days(REFRESH_TTL_DAYS))
            .build();

        CookieJar::new().add(access).add(refresh)
    }
}

pub fn clear_cookies() -> CookieJar {
    let access = Cookie::build((ACCESS_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let refresh = Cookie::build((REFRESH_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access).add(refresh)
}

pub fn generate_refresh_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Mint a fresh access token and persist a new refresh token for `user`.
pub async fn issue(pool: &PgPool, user: &User, jwt_secret: &str) -> Result<IssuedTokens, AppError> {
    let access_token =
        jwt::encode_token(&Claims::for_user(user), jwt_secret).map_err(AppError::Internal)?;

    let refresh_token = generate_refresh_token();
    db::refresh_tokens::store(
        pool,
        user.id,
        &hash_token(&refresh_token),
        Utc::now() + Duration::days(REFRESH_TTL_DAYS),
    )
    .await?;

    Ok(IssuedTokens {
        access_token,
        refresh_token,
    })
}

/// Trade a refresh token for a new pair. A token presented twice means it
/// leaked: every session of its owner is revoked.
pub async fn rotate(pool: &PgPool, presented: &str, jwt_secret: &str) -> Result<(User, IssuedTokens), AppError> {
    let hash = hash_token(presented);

    let Some(claimed) = db::refresh_tokens::claim(pool, &hash).await? else {
        if let Some(spent) = db::refresh_tokens::lookup(pool, &hash).await? {
            let revoked = db::refresh_tokens::revoke_user(pool, spent.user_id).await?;
            tracing::warn!(user_id = %spent.user_id, revoked, "Refresh token reuse detected, sessions revoked");
            return Err(AppError::Unauthorized(
                "Refresh token reuse detected. All sessions revoked.".to_string(),
            ));
        }
        return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
    };

    if claimed.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db::users::find_by_id(pool, claimed.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Account inactive".to_string()))?;

    let issued = issue(pool, &user, jwt_secret).await?;
    Ok((user, issued))
}
