use sqlx::PgPool;
use uuid::Uuid;

/// Record who did what to which resource. Called by handlers after a change
/// has been committed; a failed write is logged and never fails the request.
/// Platform-level events (tenant deletion, bootstrap) carry no tenant.
pub async fn log_event(
    pool: &PgPool,
    tenant_id: Option<Uuid>,
    user_id: Option<Uuid>,
    action: &str,
    resource_type: &str,
    resource_id: Option<Uuid>,
    details: Option<serde_json::Value>,
) {
    match crate::db::audit::log_event(
        pool,
        tenant_id,
        user_id,
        action,
        resource_type,
        resource_id,
        details,
    )
    .await
    {
        Ok(()) => tracing::debug!(action, resource_type, "Audit event recorded"),
        Err(e) => tracing::error!(action, "Failed to log audit event: {e}"),
    }
}
