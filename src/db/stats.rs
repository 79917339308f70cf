use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::access::Scope;

/// Half-open `[from, to)` range over `searches.created_at`. `to = None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub from: DateTime<Utc>,
    pub to: Option<DateTime<Utc>>,
}

impl Span {
    pub fn since(from: DateTime<Utc>) -> Self {
        Span { from, to: None }
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Span { from, to: Some(to) }
    }

    pub(crate) fn push(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" AND s.created_at >= ").push_bind(self.from);
        if let Some(to) = self.to {
            qb.push(" AND s.created_at < ").push_bind(to);
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserVolume {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub searches: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlatformTotals {
    pub searches: i64,
    pub batches: i64,
    pub tenants: i64,
    pub active_users: i64,
    pub pending_batches: i64,
}

const UTC_DAY: &str = "(s.created_at AT TIME ZONE 'UTC')::date";

pub async fn count_searches(pool: &PgPool, scope: &Scope, span: &Span) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM searches s WHERE true");
    scope.push_predicate(&mut qb, "s");
    span.push(&mut qb);
    let row: (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}

/// Record counts per stored classification label.
pub async fn tier_counts(
    pool: &PgPool,
    scope: &Scope,
    span: &Span,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT r.classification, COUNT(*)
         FROM records r
         JOIN searches s ON s.id = r.search_id
         WHERE true",
    );
    scope.push_predicate(&mut qb, "s");
    span.push(&mut qb);
    qb.push(" GROUP BY r.classification");
    qb.build_query_as().fetch_all(pool).await
}

/// Searches per UTC day. Days without searches are absent.
pub async fn daily_searches(
    pool: &PgPool,
    scope: &Scope,
    span: &Span,
) -> Result<Vec<(NaiveDate, i64)>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {UTC_DAY} AS day, COUNT(*) FROM searches s WHERE true"
    ));
    scope.push_predicate(&mut qb, "s");
    span.push(&mut qb);
    qb.push(" GROUP BY day ORDER BY day");
    qb.build_query_as().fetch_all(pool).await
}

/// Red-tier records per UTC day of their search.
pub async fn daily_red(
    pool: &PgPool,
    scope: &Scope,
    span: &Span,
    red_label: &str,
) -> Result<Vec<(NaiveDate, i64)>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {UTC_DAY} AS day, COUNT(*)
         FROM records r
         JOIN searches s ON s.id = r.search_id
         WHERE r.classification = "
    ));
    qb.push_bind(red_label.to_string());
    scope.push_predicate(&mut qb, "s");
    span.push(&mut qb);
    qb.push(" GROUP BY day ORDER BY day");
    qb.build_query_as().fetch_all(pool).await
}

/// Most frequent list types among red-tier records. A missing list type is
/// grouped under `missing_label`; ties go alphabetically.
pub async fn top_red_sources(
    pool: &PgPool,
    scope: &Scope,
    span: &Span,
    red_label: &str,
    missing_label: &str,
    limit: i64,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COALESCE(NULLIF(r.list_type, ''), ");
    qb.push_bind(missing_label.to_string());
    qb.push(
        ") AS source, COUNT(*) AS hits
         FROM records r
         JOIN searches s ON s.id = r.search_id
         WHERE r.classification = ",
    );
    qb.push_bind(red_label.to_string());
    scope.push_predicate(&mut qb, "s");
    span.push(&mut qb);
    qb.push(" GROUP BY 1 ORDER BY hits DESC, 1 ASC LIMIT ")
        .push_bind(limit);
    qb.build_query_as().fetch_all(pool).await
}

/// Users ranked by how many searches they ran. Searches whose owner was
/// deleted are not attributed to anyone.
pub async fn top_users(
    pool: &PgPool,
    scope: &Scope,
    span: Option<&Span>,
    limit: i64,
) -> Result<Vec<UserVolume>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT u.id AS user_id, u.name, u.email, COUNT(*) AS searches
         FROM searches s
         JOIN users u ON u.id = s.user_id
         WHERE true",
    );
    scope.push_predicate(&mut qb, "s");
    if let Some(span) = span {
        span.push(&mut qb);
    }
    qb.push(" GROUP BY u.id, u.name, u.email ORDER BY searches DESC, u.name ASC LIMIT ")
        .push_bind(limit);
    qb.build_query_as::<UserVolume>().fetch_all(pool).await
}

/// All-time searches per calendar month, labelled `YYYY-MM`.
pub async fn monthly_searches(pool: &PgPool, scope: &Scope) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT to_char(date_trunc('month', s.created_at AT TIME ZONE 'UTC'), 'YYYY-MM') AS month, COUNT(*)
         FROM searches s
         WHERE true",
    );
    scope.push_predicate(&mut qb, "s");
    qb.push(" GROUP BY month ORDER BY month");
    qb.build_query_as().fetch_all(pool).await
}

pub async fn platform_totals(pool: &PgPool) -> Result<PlatformTotals, sqlx::Error> {
    let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
        "SELECT
            (SELECT COUNT(*) FROM searches),
            (SELECT COUNT(*) FROM batches),
            (SELECT COUNT(*) FROM tenants),
            (SELECT COUNT(*) FROM users WHERE is_active AND NOT is_superuser),
            (SELECT COUNT(*) FROM batches WHERE status = 'pending')",
    )
    .fetch_one(pool)
    .await?;

    Ok(PlatformTotals {
        searches: row.0,
        batches: row.1,
        tenants: row.2,
        active_users: row.3,
        pending_batches: row.4,
    })
}
