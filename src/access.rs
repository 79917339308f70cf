//! Who may see what.
//!
//! Every search/record query takes a [`Scope`], and scopes can only be
//! obtained from an authenticated [`AuthUser`](crate::auth::extractor::AuthUser)
//! after its capabilities have been checked. Denials go through
//! [`AccessPolicy`] so that the not-found masking rule lives in one place.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppError;

/// How capability and ownership denials are reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Report denials as `404` so callers cannot probe for existence.
    pub mask_denials: bool,
}

impl AccessPolicy {
    pub fn new(mask_denials: bool) -> Self {
        Self { mask_denials }
    }

    /// The error returned when a caller lacks a capability for `resource`.
    pub fn deny(&self, resource: &str) -> AppError {
        if self.mask_denials {
            AppError::NotFound(format!("{resource} not found"))
        } else {
            AppError::Forbidden(format!("Access to {resource} denied"))
        }
    }

    /// The error returned when a scoped lookup finds nothing. Out-of-scope
    /// rows are indistinguishable from missing ones, whatever the flag says.
    pub fn not_found(&self, resource: &str) -> AppError {
        AppError::NotFound(format!("{resource} not found"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Searches created by one user.
    Owner(Uuid),
    /// Searches stamped with one tenant.
    Tenant(Uuid),
    /// Everything. Back-office only.
    Platform,
}

/// A proof that the caller may read a slice of the search data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    kind: ScopeKind,
}

impl Scope {
    pub(crate) fn owner(user_id: Uuid) -> Self {
        Self {
            kind: ScopeKind::Owner(user_id),
        }
    }

    pub(crate) fn tenant(tenant_id: Uuid) -> Self {
        Self {
            kind: ScopeKind::Tenant(tenant_id),
        }
    }

    pub(crate) fn platform() -> Self {
        Self {
            kind: ScopeKind::Platform,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Append ` AND <predicate>` restricting the `searches` table aliased as `alias`.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        match self.kind {
            ScopeKind::Owner(user_id) => {
                qb.push(format!(" AND {alias}.user_id = "));
                qb.push_bind(user_id);
            }
            ScopeKind::Tenant(tenant_id) => {
                qb.push(format!(" AND {alias}.tenant_id = "));
                qb.push_bind(tenant_id);
            }
            ScopeKind::Platform => {}
        }
    }
}
