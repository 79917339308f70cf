use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Search {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub term: String,
    pub found_results: bool,
    pub alert: bool,
    pub created_at: DateTime<Utc>,
}

/// A search with the owning user's display name, for tenant-wide listings.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SearchWithOwner {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub term: String,
    pub found_results: bool,
    pub alert: bool,
    pub created_at: DateTime<Utc>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
}
