use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::access::{AccessPolicy, Scope};
use crate::auth::jwt::{self, Claims};
use crate::auth::tokens::ACCESS_COOKIE;
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub is_superior: bool,
    pub is_superuser: bool,
}

impl AuthUser {
    /// The caller's own searches. Always available.
    pub fn own_scope(&self) -> Scope {
        Scope::owner(self.user_id)
    }

    /// Every search of the caller's tenant. Tenant-superiors and superusers
    /// that belong to a tenant only.
    pub fn tenant_scope(&self, policy: &AccessPolicy) -> Result<Scope, AppError> {
        if !(self.is_superior || self.is_superuser) {
            return Err(policy.deny("Page"));
        }
        self.tenant_id
            .map(Scope::tenant)
            .ok_or_else(|| policy.deny("Page"))
    }

    /// Platform-wide data, optionally narrowed to one tenant. Superusers only.
    pub fn platform_scope(
        &self,
        policy: &AccessPolicy,
        tenant_id: Option<Uuid>,
    ) -> Result<Scope, AppError> {
        self.require_superuser(policy)?;
        Ok(tenant_id.map(Scope::tenant).unwrap_or_else(Scope::platform))
    }

    pub fn require_superuser(&self, policy: &AccessPolicy) -> Result<(), AppError> {
        if self.is_superuser {
            Ok(())
        } else {
            Err(policy.deny("Page"))
        }
    }

    /// The caller's tenant, for tenant-owned resources such as batches.
    pub fn require_tenant(&self, policy: &AccessPolicy) -> Result<Uuid, AppError> {
        self.tenant_id.ok_or_else(|| policy.deny("Page"))
    }

    fn from_claims(claims: Claims) -> Self {
        AuthUser {
            user_id: claims.sub,
            tenant_id: claims.tid,
            is_superior: claims.sup,
            is_superuser: claims.adm,
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        // Bearer token first, then the browser cookie
        if let Some(auth_header) = parts.headers.get("authorization") {
            let auth_str = auth_header
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let claims = jwt::decode_token(token, &state.config.jwt_secret)
                    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
                return Ok(AuthUser::from_claims(claims));
            }
        }

        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get(ACCESS_COOKIE) {
            let claims = jwt::decode_token(cookie.value(), &state.config.jwt_secret)
                .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
            return Ok(AuthUser::from_claims(claims));
        }

        Err(AppError::Unauthorized(
            "Missing authentication token".to_string(),
        ))
    }
}
