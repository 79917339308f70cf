use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;

/// Access token lifetime.
pub const ACCESS_TTL_MINUTES: i64 = 15;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    /// Tenant, absent for platform staff without a company.
    pub tid: Option<Uuid>,
    /// Tenant-superior.
    pub sup: bool,
    /// Global superuser.
    pub adm: bool,
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user: &User) -> Self {
        Self {
            sub: user.id,
            tid: user.tenant_id,
            sup: user.is_superior,
            adm: user.is_superuser,
            exp: (Utc::now() + Duration::minutes(ACCESS_TTL_MINUTES)).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}
