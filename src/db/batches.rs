use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Batch, BatchStatus};

/// Batch row with the names the back-office shows next to it.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct BatchWithTenant {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub batch: Batch,
    pub tenant_name: String,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
}

const WITH_TENANT: &str = "SELECT b.*, t.name AS tenant_name, u.name AS requester_name, u.email AS requester_email
     FROM batches b
     JOIN tenants t ON t.id = b.tenant_id
     LEFT JOIN users u ON u.id = b.requested_by";

pub async fn create(
    pool: &PgPool,
    tenant_id: Uuid,
    requested_by: Uuid,
    file_name: &str,
    file_path: &str,
) -> Result<Batch, sqlx::Error> {
    sqlx::query_as::<_, Batch>(
        "INSERT INTO batches (tenant_id, requested_by, file_name, file_path)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(tenant_id)
    .bind(requested_by)
    .bind(file_name)
    .bind(file_path)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<BatchWithTenant>, sqlx::Error> {
    sqlx::query_as::<_, BatchWithTenant>(&format!("{WITH_TENANT} WHERE b.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id_scoped(
    pool: &PgPool,
    id: Uuid,
    tenant_id: Uuid,
) -> Result<Option<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Batch>, sqlx::Error> {
    sqlx::query_as::<_, Batch>(
        "SELECT * FROM batches WHERE tenant_id = $1 ORDER BY requested_at DESC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

/// Every stored file (sources and results) belonging to a tenant's batches.
pub async fn file_paths_for_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT file_path FROM batches WHERE tenant_id = $1
         UNION ALL
         SELECT result_path FROM batches WHERE tenant_id = $1 AND result_path IS NOT NULL",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

/// Back-office queue: pending first, then in progress, then finished; newest first within each.
pub async fn list_all(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<BatchWithTenant>, sqlx::Error> {
    sqlx::query_as::<_, BatchWithTenant>(&format!(
        "{WITH_TENANT}
         ORDER BY CASE b.status
                    WHEN 'pending' THEN 0
                    WHEN 'processing' THEN 1
                    ELSE 2
                  END,
                  b.requested_at DESC
         LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM batches")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM batches WHERE status = 'pending'")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Move a batch to `status`, optionally attaching the result document.
/// A missing result keeps whatever was attached before.
pub async fn process(
    pool: &PgPool,
    id: Uuid,
    status: BatchStatus,
    notes: Option<&str>,
    result: Option<(&str, &str)>,
) -> Result<Option<Batch>, sqlx::Error> {
    let (result_file_name, result_path) = result.unzip();
    sqlx::query_as::<_, Batch>(
        "UPDATE batches
         SET status = $2,
             notes = COALESCE($3, notes),
             result_file_name = COALESCE($4, result_file_name),
             result_path = COALESCE($5, result_path),
             processed_at = CASE WHEN $2 IN ('completed', 'rejected') THEN now() ELSE processed_at END
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(notes)
    .bind(result_file_name)
    .bind(result_path)
    .fetch_optional(pool)
    .await
}
