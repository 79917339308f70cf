use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{align_daily, DailySeries, Month, RankedSource, TierCounts, Window, MISSING_LIST_TYPE};
use crate::access::Scope;
use crate::db::searches::SearchFilter;
use crate::db::stats::{self, PlatformTotals, UserVolume};
use crate::db;
use crate::models::{SearchWithOwner, TenantWithCounts};
use crate::screening::Classification;

const TOP_N: i64 = 5;

/// The window metrics shared by every dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub total_searches: i64,
    pub searches_today: i64,
    pub tiers: TierCounts,
    pub tiers_today: TierCounts,
    pub daily: DailySeries,
    pub top_red_sources: Vec<RankedSource>,
    pub recent: Vec<SearchWithOwner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantDashboard {
    #[serde(flatten)]
    pub overview: Overview,
    pub active_users: i64,
    pub top_users: Vec<UserVolume>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthPoint {
    pub month: String,
    pub searches: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformDashboard {
    #[serde(flatten)]
    pub overview: Overview,
    pub totals: PlatformTotals,
    pub monthly: Vec<MonthPoint>,
    pub tenants: Vec<TenantWithCounts>,
    pub selected_tenant: Option<Uuid>,
    pub top_users: Vec<UserVolume>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub month: String,
    pub tenant_id: Option<Uuid>,
    pub total: i64,
    pub labels: Vec<String>,
    pub counts: Vec<i64>,
}

pub async fn overview(
    pool: &PgPool,
    scope: &Scope,
    window: &Window,
    recent_limit: i64,
) -> Result<Overview, sqlx::Error> {
    let span = window.span();
    let today = window.today();
    let red = Classification::Red.as_str();

    let total_searches = stats::count_searches(pool, scope, &span).await?;
    let searches_today = stats::count_searches(pool, scope, &today).await?;
    let tiers = TierCounts::from_rows(&stats::tier_counts(pool, scope, &span).await?);
    let tiers_today = TierCounts::from_rows(&stats::tier_counts(pool, scope, &today).await?);

    let daily = align_daily(
        &stats::daily_searches(pool, scope, &span).await?,
        &stats::daily_red(pool, scope, &span, red).await?,
    );

    let top_red_sources = stats::top_red_sources(pool, scope, &span, red, MISSING_LIST_TYPE, TOP_N)
        .await?
        .into_iter()
        .map(|(source, hits)| RankedSource { source, hits })
        .collect();

    let in_window = SearchFilter {
        span: Some(span),
        ..SearchFilter::default()
    };
    let recent = db::searches::list(pool, scope, &in_window, recent_limit, 0).await?;

    Ok(Overview {
        total_searches,
        searches_today,
        tiers,
        tiers_today,
        daily,
        top_red_sources,
        recent,
    })
}

/// A user's own activity.
pub async fn personal(pool: &PgPool, scope: &Scope, window: &Window) -> Result<Overview, sqlx::Error> {
    overview(pool, scope, window, 5).await
}

/// Tenant-wide activity for tenant superiors.
pub async fn tenant(
    pool: &PgPool,
    scope: &Scope,
    tenant_id: Uuid,
    window: &Window,
) -> Result<TenantDashboard, sqlx::Error> {
    let overview = overview(pool, scope, window, 10).await?;
    let active_users = db::users::count_active_by_tenant(pool, tenant_id).await?;
    let top_users = stats::top_users(pool, scope, Some(&window.span()), TOP_N).await?;

    Ok(TenantDashboard {
        overview,
        active_users,
        top_users,
    })
}

/// Back-office view over every tenant. `selected_tenant` picks whose top
/// users are ranked; without it the busiest tenant is used.
pub async fn platform(
    pool: &PgPool,
    scope: &Scope,
    window: &Window,
    selected_tenant: Option<Uuid>,
) -> Result<PlatformDashboard, sqlx::Error> {
    let overview = overview(pool, scope, window, 5).await?;
    let totals = stats::platform_totals(pool).await?;
    let monthly = stats::monthly_searches(pool, scope)
        .await?
        .into_iter()
        .map(|(month, searches)| MonthPoint { month, searches })
        .collect();
    let tenants = db::tenants::list_with_counts(pool).await?;

    let selected_tenant = selected_tenant
        .filter(|id| tenants.iter().any(|t| t.id == *id))
        .or_else(|| tenants.first().map(|t| t.id));

    let top_users = match selected_tenant {
        Some(tenant_id) => stats::top_users(pool, &Scope::tenant(tenant_id), None, TOP_N).await?,
        None => Vec::new(),
    };

    Ok(PlatformDashboard {
        overview,
        totals,
        monthly,
        tenants,
        selected_tenant,
        top_users,
    })
}

/// Searches per day for one calendar month.
pub async fn monthly_report(
    pool: &PgPool,
    scope: &Scope,
    month: Month,
    tenant_id: Option<Uuid>,
) -> Result<MonthlyReport, sqlx::Error> {
    let span = month.span();
    let total = stats::count_searches(pool, scope, &span).await?;
    let (labels, counts) = stats::daily_searches(pool, scope, &span)
        .await?
        .into_iter()
        .map(|(day, n)| (day.format("%Y-%m-%d").to_string(), n))
        .unzip();

    Ok(MonthlyReport {
        month: month.label(),
        tenant_id,
        total,
        labels,
        counts,
    })
}
