use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::access::Scope;
use crate::db::stats::Span;
use crate::models::{Search, SearchWithOwner};

const WITH_OWNER: &str = "SELECT s.id, s.tenant_id, s.user_id, s.term, s.found_results, s.alert, s.created_at,
            u.name AS owner_name, u.email AS owner_email
     FROM searches s
     LEFT JOIN users u ON u.id = s.user_id
     WHERE true";

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant_id: Option<Uuid>,
    user_id: Option<Uuid>,
    term: &str,
) -> Result<Search, sqlx::Error> {
    sqlx::query_as::<_, Search>(
        "INSERT INTO searches (tenant_id, user_id, term) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(tenant_id)
    .bind(user_id)
    .bind(term)
    .fetch_one(executor)
    .await
}

pub async fn set_flags<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    found_results: bool,
    alert: bool,
) -> Result<Search, sqlx::Error> {
    sqlx::query_as::<_, Search>(
        "UPDATE searches SET found_results = $2, alert = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(found_results)
    .bind(alert)
    .fetch_one(executor)
    .await
}

/// Look a search up inside `scope`. Out-of-scope ids behave like missing ones.
pub async fn find_scoped(
    pool: &PgPool,
    scope: &Scope,
    id: Uuid,
) -> Result<Option<SearchWithOwner>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(WITH_OWNER);
    qb.push(" AND s.id = ").push_bind(id);
    scope.push_predicate(&mut qb, "s");
    qb.build_query_as::<SearchWithOwner>()
        .fetch_optional(pool)
        .await
}

/// Optional narrowing applied on top of a scope.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub user_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub term: Option<String>,
    pub has_results: Option<bool>,
    /// Exact timestamp bounds, used by the dashboards' trailing window.
    pub span: Option<Span>,
}

impl SearchFilter {
    fn push(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(user_id) = self.user_id {
            qb.push(" AND s.user_id = ").push_bind(user_id);
        }
        if let Some(from) = self.date_from {
            qb.push(" AND (s.created_at AT TIME ZONE 'UTC')::date >= ")
                .push_bind(from);
        }
        if let Some(to) = self.date_to {
            qb.push(" AND (s.created_at AT TIME ZONE 'UTC')::date <= ")
                .push_bind(to);
        }
        if let Some(term) = &self.term {
            qb.push(" AND s.term ILIKE ")
                .push_bind(format!("%{}%", escape_like(term)));
        }
        if let Some(has_results) = self.has_results {
            qb.push(" AND s.found_results = ").push_bind(has_results);
        }
        if let Some(span) = &self.span {
            span.push(qb);
        }
    }
}

pub async fn list(
    pool: &PgPool,
    scope: &Scope,
    filter: &SearchFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<SearchWithOwner>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(WITH_OWNER);
    scope.push_predicate(&mut qb, "s");
    filter.push(&mut qb);
    qb.push(" ORDER BY s.created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    qb.build_query_as::<SearchWithOwner>().fetch_all(pool).await
}

pub async fn count(
    pool: &PgPool,
    scope: &Scope,
    filter: &SearchFilter,
) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM searches s WHERE true");
    scope.push_predicate(&mut qb, "s");
    filter.push(&mut qb);
    let row: (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}

/// Escape `%`, `_` and `\` so user text is matched literally by ILIKE.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
