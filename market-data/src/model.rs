//! Market data shapes as served by CoinGecko.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

/// One entry of the upstream coin catalog (`/coins/list`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRecord {
    /// Stable upstream identifier, e.g. `bitcoin`.
    pub id: String,
    /// Ticker, e.g. `btc`. Not unique across records.
    pub symbol: String,
    /// Display name, e.g. `Bitcoin`. Not unique across records.
    pub name: String,
    /// Chain name -> contract address. Only present for tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<HashMap<String, Option<String>>>,
}

impl CoinRecord {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            platforms: None,
        }
    }

    /// Lowercased `(name, symbol)`, the keys name lookup compares against.
    pub(crate) fn search_keys(&self) -> (String, String) {
        (self.name.to_lowercase(), self.symbol.to_lowercase())
    }
}

/// `(unix millis, value)` as returned by `/market_chart/range`. Upstream sends `null` for
/// gaps, kept as `None`.
pub type SeriesPoint = (i64, Option<f64>);

/// Three parallel series, passed through untouched. All three must be present: an object
/// without them (an upstream error body, say) is not a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub prices: Vec<SeriesPoint>,
    pub market_caps: Vec<SeriesPoint>,
    pub total_volumes: Vec<SeriesPoint>,
}

/// A single candlestick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<(i64, f64, f64, f64, f64)> for OhlcBar {
    fn from((timestamp, open, high, low, close): (i64, f64, f64, f64, f64)) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }
}

/// Granularity for `/market_chart/range`. Unset lets upstream pick one from the range width.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, VariantNames,
    Serialize, Deserialize,
)]
pub enum HistoricalInterval {
    #[strum(serialize = "5m")]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[strum(serialize = "hourly")]
    #[serde(rename = "hourly")]
    Hourly,
    #[strum(serialize = "daily")]
    #[serde(rename = "daily")]
    Daily,
}

/// Granularity for `/ohlc/range`.
///
/// Upstream accepts `hourly` for ranges up to 31 days and `daily` up to 180 days.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, VariantNames,
    Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OhlcInterval {
    Hourly,
    Daily,
}

/// Parameters for a `/coins/{id}/market_chart/range` request.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalQuery {
    pub id: String,
    pub vs_currency: String,
    /// UNIX seconds.
    pub from: i64,
    /// UNIX seconds.
    pub to: i64,
    pub interval: Option<HistoricalInterval>,
}

/// Parameters for a `/coins/{id}/ohlc/range` request.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcQuery {
    pub id: String,
    pub vs_currency: String,
    pub from: i64,
    pub to: i64,
    pub interval: OhlcInterval,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn catalog_entry_with_and_without_platforms() {
        let body = r#"[
            {"id":"bitcoin","symbol":"btc","name":"Bitcoin","platforms":{}},
            {"id":"usd-coin","symbol":"usdc","name":"USDC",
             "platforms":{"ethereum":"0xa0b8","solana":null}},
            {"id":"ethereum","symbol":"eth","name":"Ethereum"}
        ]"#;
        let coins: Vec<CoinRecord> = serde_json::from_str(body).unwrap();

        assert_eq!(coins.len(), 3);
        let usdc = coins[1].platforms.as_ref().unwrap();
        assert_eq!(usdc["ethereum"].as_deref(), Some("0xa0b8"));
        assert_eq!(usdc["solana"], None);
        assert!(coins[2].platforms.is_none());
    }

    #[test]
    fn ohlc_tuple_reshapes_into_named_fields() {
        let raw: Vec<(i64, f64, f64, f64, f64)> =
            serde_json::from_str("[[1711296000, 65000, 65500, 64800, 65200]]").unwrap();
        let bar = OhlcBar::from(raw[0]);

        assert_eq!(bar.timestamp, 1711296000);
        assert_eq!(bar.open, 65000.0);
        assert_eq!(bar.high, 65500.0);
        assert_eq!(bar.low, 64800.0);
        assert_eq!(bar.close, 65200.0);
    }

    #[test]
    fn interval_strings_match_upstream() {
        assert_eq!(HistoricalInterval::FiveMinutes.to_string(), "5m");
        assert_eq!(
            HistoricalInterval::from_str("hourly").unwrap(),
            HistoricalInterval::Hourly
        );
        assert_eq!(OhlcInterval::Daily.to_string(), "daily");
        assert!(OhlcInterval::from_str("5m").is_err());
        assert_eq!(OhlcInterval::VARIANTS, &["hourly", "daily"]);
        assert_eq!(HistoricalInterval::VARIANTS, &["5m", "hourly", "daily"]);
    }

    #[test]
    fn search_keys_are_lowercased_name_and_symbol() {
        let btc = CoinRecord::new("bitcoin", "BTC", "Bitcoin Ξ");
        assert_eq!(btc.search_keys(), ("bitcoin ξ".to_string(), "btc".to_string()));
    }
}
