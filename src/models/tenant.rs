use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tenant row joined with its activity counters, for the back-office tables.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TenantWithCounts {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub user_count: i64,
    pub search_count: i64,
    pub batch_count: i64,
}
