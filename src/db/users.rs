use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

pub struct NewUser<'a> {
    pub tenant_id: Option<Uuid>,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub is_superior: bool,
    pub is_superuser: bool,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    new: &NewUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (tenant_id, email, password_hash, name, is_superior, is_superuser)
         VALUES ($1, lower($2), $3, $4, $5, $6) RETURNING *",
    )
    .bind(new.tenant_id)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.name)
    .bind(new.is_superior)
    .bind(new.is_superuser)
    .fetch_one(executor)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = lower($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count_all<'e, E: sqlx::PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}

pub async fn list_all(pool: &PgPool, tenant_id: Option<Uuid>) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE ($1::uuid IS NULL OR tenant_id = $1)
         ORDER BY is_active DESC, created_at DESC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

pub async fn list_active_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE tenant_id = $1 AND is_active ORDER BY name ASC",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

pub async fn count_active_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND is_active")
            .bind(tenant_id)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

pub struct UserChanges<'a> {
    pub tenant_id: Option<Uuid>,
    pub email: &'a str,
    pub name: &'a str,
    pub is_superior: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

pub async fn update(pool: &PgPool, id: Uuid, changes: &UserChanges<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users
         SET tenant_id = $2, email = lower($3), name = $4, is_superior = $5, is_superuser = $6, is_active = $7
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(changes.tenant_id)
    .bind(changes.email)
    .bind(changes.name)
    .bind(changes.is_superior)
    .bind(changes.is_superuser)
    .bind(changes.is_active)
    .fetch_one(pool)
    .await
}

pub async fn update_password(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Soft delete. Searches keep pointing at the user.
pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
