//! Upstream CoinGecko access.
//!
//! [`MarketDataSource`] is the seam the cache and the dispatcher talk to; [`CoinGeckoClient`]
//! is the reqwest-backed implementation. Every call is exactly one GET, with no retry or
//! backoff. Failures of any kind surface as [`UpstreamError`].

use crate::error::UpstreamError;
use crate::model::{CoinRecord, HistoricalQuery, HistoricalSeries, OhlcBar, OhlcQuery};
use async_trait::async_trait;
use derive_builder::Builder;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("market-tools/", env!("CARGO_PKG_VERSION"));
/// Upper bound on how much of an error body is kept in the error message.
const ERROR_BODY_LIMIT: usize = 512;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Full coin catalog, including on-chain platform metadata.
    async fn fetch_catalog(&self) -> Result<Vec<CoinRecord>, UpstreamError>;

    async fn fetch_historical_range(
        &self,
        query: &HistoricalQuery,
    ) -> Result<HistoricalSeries, UpstreamError>;

    async fn fetch_ohlc_range(&self, query: &OhlcQuery) -> Result<Vec<OhlcBar>, UpstreamError>;
}

/// CoinGecko API plan. Decides the default host and the name of the key header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApiPlan {
    #[default]
    Pro,
    Demo,
}

impl ApiPlan {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ApiPlan::Pro => "https://pro-api.coingecko.com/api/v3",
            ApiPlan::Demo => "https://api.coingecko.com/api/v3",
        }
    }

    pub fn key_header(&self) -> &'static str {
        match self {
            ApiPlan::Pro => "x-cg-pro-api-key",
            ApiPlan::Demo => "x-cg-demo-api-key",
        }
    }
}

#[derive(Builder, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct CoinGeckoConfig {
    /// API key sent with every request
    #[builder(setter(into))]
    pub(crate) api_key: String,
    #[builder(default)]
    pub(crate) plan: ApiPlan,
    /// Overrides the plan's default host, e.g. for a local stub
    #[builder(setter(into, strip_option), default)]
    pub(crate) base_url: Option<String>,
    /// No timeout unless set; a hung upstream call otherwise hangs the request
    #[builder(setter(strip_option), default)]
    pub(crate) timeout: Option<Duration>,
}

impl std::fmt::Debug for CoinGeckoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoConfig")
            .field("api_key", &"<redacted>")
            .field("plan", &self.plan)
            .field("base_url", &self.base_url())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CoinGeckoConfig {
    pub fn builder() -> CoinGeckoConfigBuilder {
        CoinGeckoConfigBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.plan.default_base_url())
    }

    pub fn plan(&self) -> ApiPlan {
        self.plan
    }
}

impl CoinGeckoConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(key) = &self.api_key {
            if key.trim().is_empty() {
                return Err("API key cannot be empty".into());
            }
        }
        if let Some(Some(url)) = &self.base_url {
            Url::parse(url).map_err(|e| format!("invalid base URL '{url}': {e}"))?;
        }
        Ok(())
    }
}

/// reqwest-backed [`MarketDataSource`].
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base: Url,
    key_header: &'static str,
    api_key: String,
}

impl CoinGeckoClient {
    pub fn new(config: &CoinGeckoConfig) -> Result<Self, UpstreamError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let base = Url::parse(config.base_url())
            .map_err(|e| UpstreamError::new(format!("invalid base URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(UpstreamError::new(format!(
                "base URL cannot carry a path: {base}"
            )));
        }

        Ok(Self {
            client,
            base,
            key_header: config.plan.key_header(),
            api_key: config.api_key.clone(),
        })
    }

    pub(crate) fn catalog_url(&self) -> Url {
        let mut url = self.endpoint(&["coins", "list"]);
        url.query_pairs_mut().append_pair("include_platform", "true");
        url
    }

    pub(crate) fn historical_url(&self, query: &HistoricalQuery) -> Url {
        let mut url = self.endpoint(&["coins", &query.id, "market_chart", "range"]);
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("vs_currency", &query.vs_currency);
            qp.append_pair("from", &query.from.to_string());
            qp.append_pair("to", &query.to.to_string());
            if let Some(interval) = query.interval {
                qp.append_pair("interval", interval.into());
            }
        }
        url
    }

    pub(crate) fn ohlc_url(&self, query: &OhlcQuery) -> Url {
        let mut url = self.endpoint(&["coins", &query.id, "ohlc", "range"]);
        url.query_pairs_mut()
            .append_pair("vs_currency", &query.vs_currency)
            .append_pair("from", &query.from.to_string())
            .append_pair("to", &query.to.to_string())
            .append_pair("interval", query.interval.into());
        url
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Single authenticated GET; returns the raw body of a 2xx response.
    async fn get(&self, url: Url) -> Result<Vec<u8>, UpstreamError> {
        debug!(%url, "coingecko: GET");

        let resp = self
            .client
            .get(url.clone())
            .header("accept", "application/json")
            .header(self.key_header, &self.api_key)
            .send()
            .await
            .inspect_err(|e| warn!(%url, "coingecko: request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%url, %status, "coingecko: non-success status");
            return Err(UpstreamError::with_status(
                status.as_u16(),
                truncate(body.trim(), ERROR_BODY_LIMIT),
            ));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(body)
}

/// Upstream answers `[[ts, open, high, low, close], ...]`.
pub(crate) fn parse_ohlc_body(body: &[u8]) -> Result<Vec<OhlcBar>, serde_json::Error> {
    let rows: Vec<(i64, f64, f64, f64, f64)> = parse_body(body)?;
    Ok(rows.into_iter().map(OhlcBar::from).collect())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_catalog(&self) -> Result<Vec<CoinRecord>, UpstreamError> {
        let body = self.get(self.catalog_url()).await?;
        Ok(parse_body(&body)?)
    }

    async fn fetch_historical_range(
        &self,
        query: &HistoricalQuery,
    ) -> Result<HistoricalSeries, UpstreamError> {
        let body = self.get(self.historical_url(query)).await?;
        Ok(parse_body(&body)?)
    }

    async fn fetch_ohlc_range(&self, query: &OhlcQuery) -> Result<Vec<OhlcBar>, UpstreamError> {
        let body = self.get(self.ohlc_url(query)).await?;
        Ok(parse_ohlc_body(&body)?)
    }
}
