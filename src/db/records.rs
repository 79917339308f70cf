use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Record;
use crate::screening::{Classification, RawRecord};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    search_id: Uuid,
    raw: &RawRecord,
    classification: Classification,
) -> Result<Record, sqlx::Error> {
    sqlx::query_as::<_, Record>(
        "INSERT INTO records (
            search_id, full_name, identification, list_type, list_origin, related_to, source,
            is_restrictive, is_bulletin, alias, name_match, id_match, person_type,
            source_updated_at, status, image_key, classification
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
         RETURNING *",
    )
    .bind(search_id)
    .bind(truncate(&raw.full_name, 255))
    .bind(truncate(&raw.identification, 50))
    .bind(truncate(&raw.list_type, 100))
    .bind(truncate(&raw.list_origin, 100))
    .bind(&raw.related_to)
    .bind(truncate(&raw.source, 255))
    .bind(raw.restrictive)
    .bind(raw.bulletin)
    .bind(truncate(&raw.alias, 255))
    .bind(raw.name_match)
    .bind(raw.id_match)
    .bind(truncate(&raw.person_type, 50))
    .bind(truncate(&raw.updated_at, 100))
    .bind(truncate(&raw.status, 100))
    .bind(truncate(&raw.image_key, 255))
    .bind(classification.as_str())
    .fetch_one(executor)
    .await
}

pub async fn list_for_search(pool: &PgPool, search_id: Uuid) -> Result<Vec<Record>, sqlx::Error> {
    sqlx::query_as::<_, Record>(
        "SELECT * FROM records WHERE search_id = $1
         ORDER BY is_restrictive DESC, name_match DESC, created_at ASC",
    )
    .bind(search_id)
    .fetch_all(pool)
    .await
}

/// Provider strings are stored verbatim up to the column width.
fn truncate(value: &Option<String>, max: usize) -> Option<String> {
    value.as_ref().map(|s| s.chars().take(max).collect())
}
