use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Tenant, TenantWithCounts};

pub async fn create(pool: &PgPool, name: &str, slug: &str) -> Result<Tenant, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "INSERT INTO tenants (name, slug) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY name ASC")
        .fetch_all(pool)
        .await
}

/// Every tenant with its all-time activity, busiest first.
pub async fn list_with_counts(pool: &PgPool) -> Result<Vec<TenantWithCounts>, sqlx::Error> {
    sqlx::query_as::<_, TenantWithCounts>(
        "SELECT t.id, t.name, t.slug, t.created_at,
                (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id AND u.is_active) AS user_count,
                (SELECT COUNT(*) FROM searches s WHERE s.tenant_id = t.id) AS search_count,
                (SELECT COUNT(*) FROM batches b WHERE b.tenant_id = t.id) AS batch_count
         FROM tenants t
         ORDER BY search_count DESC, t.name ASC",
    )
    .fetch_all(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    slug: &str,
) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET name = $2, slug = $3, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(slug)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
