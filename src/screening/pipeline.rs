use sqlx::PgPool;
use uuid::Uuid;

use super::{classify, RawRecord, ScreeningClient, ScreeningQuery};
use crate::db;
use crate::error::AppError;
use crate::models::{Record, Search};

/// Who a search is recorded for.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub search: Search,
    pub records: Vec<Record>,
    /// The provider errored. Callers see the same result as "no matches".
    pub provider_failed: bool,
}

/// `(found_results, alert)` for what the provider returned.
pub fn summarize(items: Option<&[RawRecord]>) -> (bool, bool) {
    match items {
        Some(items) => (!items.is_empty(), items.iter().any(|r| r.restrictive)),
        None => (false, false),
    }
}

/// Query the provider once and persist the search with its records.
///
/// Provider failures are absorbed into an empty search. The search row, its
/// records and the final flags are written in one transaction; any database
/// error rolls all of it back.
pub async fn run(
    pool: &PgPool,
    client: &dyn ScreeningClient,
    requester: Requester,
    query: &ScreeningQuery,
) -> Result<SearchOutcome, AppError> {
    let (items, provider_failed) = match client.query(query).await {
        Ok(items) => (items, false),
        Err(e) => {
            tracing::warn!(user_id = %requester.user_id, mode = query.path(), "Screening provider failed: {e}");
            (None, true)
        }
    };

    let mut tx = pool.begin().await?;

    let search = db::searches::create(
        &mut *tx,
        requester.tenant_id,
        Some(requester.user_id),
        &query.term(),
    )
    .await?;

    let mut records = Vec::new();
    for item in items.as_deref().unwrap_or_default() {
        let classification = classify(item.list_type.as_deref());
        let record = db::records::create(&mut *tx, search.id, item, classification).await?;
        records.push(record);
    }

    let (found_results, alert) = summarize(items.as_deref());
    let search = db::searches::set_flags(&mut *tx, search.id, found_results, alert).await?;

    tx.commit().await?;

    tracing::info!(
        search_id = %search.id,
        records = records.len(),
        alert,
        "Search persisted"
    );

    Ok(SearchOutcome {
        search,
        records,
        provider_failed,
    })
}
