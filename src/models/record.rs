use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub search_id: Uuid,
    pub full_name: Option<String>,
    pub identification: Option<String>,
    pub list_type: Option<String>,
    pub list_origin: Option<String>,
    pub related_to: Option<String>,
    pub source: Option<String>,
    pub is_restrictive: bool,
    pub is_bulletin: bool,
    pub alias: Option<String>,
    pub name_match: i32,
    pub id_match: i32,
    pub person_type: Option<String>,
    pub source_updated_at: Option<String>,
    pub status: Option<String>,
    pub image_key: Option<String>,
    pub classification: String,
    pub created_at: DateTime<Utc>,
}
