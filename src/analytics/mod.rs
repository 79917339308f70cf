//! Counting and charting over persisted searches.

pub mod dashboard;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::db::stats::Span;
use crate::screening::Classification;

pub const WINDOW_DAYS: i64 = 30;
pub const MISSING_LIST_TYPE: &str = "N/A";

/// The trailing window every dashboard reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub now: DateTime<Utc>,
    pub start: DateTime<Utc>,
    /// Midnight UTC of `now`'s calendar date.
    pub today_start: DateTime<Utc>,
}

impl Window {
    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        let today_start = Utc.from_utc_datetime(&now.date_naive().and_time(chrono::NaiveTime::MIN));
        Window {
            now,
            start: now - Duration::days(days),
            today_start,
        }
    }

    pub fn span(&self) -> Span {
        Span::since(self.start)
    }

    pub fn today(&self) -> Span {
        Span::since(self.today_start)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub red: i64,
    pub amber: i64,
    pub pep: i64,
    pub unclassified: i64,
}

impl TierCounts {
    /// Fold `(label, count)` rows as returned by `db::stats::tier_counts`.
    pub fn from_rows(rows: &[(String, i64)]) -> Self {
        let mut counts = TierCounts::default();
        for (label, n) in rows {
            match Classification::from_label(label) {
                Classification::Red => counts.red += n,
                Classification::Amber => counts.amber += n,
                Classification::Pep => counts.pep += n,
                Classification::Unclassified => counts.unclassified += n,
            }
        }
        counts
    }

    pub fn total(&self) -> i64 {
        self.red + self.amber + self.pep + self.unclassified
    }
}

/// Searches and red hits per day, on one shared label axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailySeries {
    pub labels: Vec<String>,
    pub searches: Vec<i64>,
    pub red: Vec<i64>,
}

/// Build the chart axis from the days that had searches and reindex the red
/// counts onto it. Red counts on days without searches are dropped; days with
/// searches but no red hits get 0.
pub fn align_daily(searches: &[(NaiveDate, i64)], red: &[(NaiveDate, i64)]) -> DailySeries {
    let mut series = DailySeries::default();
    for (day, count) in searches {
        series.labels.push(day.format("%d/%m").to_string());
        series.searches.push(*count);
        let hits = red
            .iter()
            .find(|(d, _)| d == day)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        series.red.push(hits);
    }
    series
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSource {
    pub source: String,
    pub hits: i64,
}

/// Calendar month selected for the monthly report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse `YYYY-MM`, falling back to the month of `today` on anything else.
    pub fn parse_or(raw: Option<&str>, today: NaiveDate) -> Self {
        raw.and_then(|s| NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").ok())
            .map(Month::of)
            .unwrap_or_else(|| Month::of(today))
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Month {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Month {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn span(&self) -> Span {
        let start = |m: &Month| Utc.from_utc_datetime(&m.first_day().and_time(chrono::NaiveTime::MIN));
        Span::between(start(self), start(&self.next()))
    }

    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}
