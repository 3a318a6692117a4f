//! Result shapes and the text payload that carries them.

use crate::error::ToolError;
use chrono::{DateTime, SecondsFormat, Utc};
use market_data::{CoinRecord, HistoricalSeries, IdMatch, OhlcBar};
use serde::Serialize;

/// What an operation hands back to the host: one block of text, JSON inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPayload {
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolPayload {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            text: serde_json::to_string_pretty(value)?,
            is_error: false,
        })
    }

    /// Error rendered the way a tool-invocation host reports it back to the model.
    pub fn from_error(err: &ToolError) -> Self {
        Self {
            text: err.to_string(),
            is_error: true,
        }
    }
}

/// ISO-8601, UTC, millisecond precision: `2024-03-24T16:00:00.000Z`.
pub fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `None` outside chrono's representable range.
pub fn unix_to_iso8601(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(iso8601)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_coins: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinListing {
    pub coins: Vec<CoinRecord>,
    pub pagination: Pagination,
    /// `None` until the catalog has been fetched once.
    pub last_updated: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ResolvedIds(pub Vec<IdMatch>);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub message: &'static str,
    pub last_updated: String,
    pub total_coins: usize,
}

#[derive(Debug, Serialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReport {
    pub id: String,
    pub target_currency: String,
    pub time_range: TimeRange,
    /// `auto` when upstream chose the granularity.
    pub interval: &'static str,
    pub data: HistoricalSeries,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OhlcReport {
    pub id: String,
    pub target_currency: String,
    pub time_range: TimeRange,
    pub interval: &'static str,
    pub data: Vec<OhlcBar>,
}
