//! Routes an operation name and its raw arguments to the coin cache or the upstream client.

use crate::error::ToolError;
use crate::operation::Operation;
use crate::payload::{
    iso8601, unix_to_iso8601, CoinListing, HistoricalReport, OhlcReport, Pagination,
    RefreshSummary, ResolvedIds, TimeRange, ToolPayload,
};
use crate::schema::{
    self, FunctionCalling, SchemaFormat, SchemaFormatter, ToolListing, DEFAULT_PAGE_SIZE,
};
use market_data::{
    CoinCache, HistoricalInterval, HistoricalQuery, MarketDataSource, OhlcInterval, OhlcQuery,
    Refreshed, UpstreamError,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

const REFRESH_MESSAGE: &str = "Coin catalog refreshed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCoinsArgs {
    page: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ResolveIdsArgs {
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoricalArgs {
    id: String,
    target_currency: String,
    from: i64,
    to: i64,
    interval: Option<HistoricalInterval>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OhlcArgs {
    id: String,
    target_currency: String,
    from: i64,
    to: i64,
    interval: OhlcInterval,
}

pub struct Dispatcher {
    cache: CoinCache,
    source: Arc<dyn MarketDataSource>,
}

impl Dispatcher {
    pub fn new(cache: CoinCache, source: Arc<dyn MarketDataSource>) -> Self {
        Self { cache, source }
    }

    /// Cache and live calls share one source.
    pub fn from_source(source: Arc<dyn MarketDataSource>) -> Self {
        Self::new(CoinCache::new(Arc::clone(&source)), source)
    }

    pub fn cache(&self) -> &CoinCache {
        &self.cache
    }

    /// Populates the cache before the first request. The caller decides what a failure means.
    pub async fn init(&self) -> Result<Refreshed, UpstreamError> {
        let refreshed = self.cache.refresh().await?;
        info!(coins = refreshed.coins, "dispatcher: coin cache ready");
        Ok(refreshed)
    }

    pub fn list_tools(&self) -> Value {
        SchemaFormatter::from(ToolListing).render()
    }

    pub fn function_definitions(&self) -> Value {
        SchemaFormatter::from(FunctionCalling).render()
    }

    /// Runs the operation named `name` (tool-invocation style, e.g. `list-coins`).
    ///
    /// `args` must be a JSON object or `null`. Arguments are validated before the cache or
    /// the network is touched.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<ToolPayload, ToolError> {
        let operation = name
            .parse::<Operation>()
            .map_err(|_| ToolError::UnknownOperation(name.to_string()))?;
        self.run(operation, args).await
    }

    /// Same as [`Self::dispatch`], keyed by function-calling name (e.g. `list_coins`).
    pub async fn dispatch_function(&self, name: &str, args: Value) -> Result<ToolPayload, ToolError> {
        let operation = Operation::from_function_name(name)
            .ok_or_else(|| ToolError::UnknownOperation(name.to_string()))?;
        self.run(operation, args).await
    }

    async fn run(&self, operation: Operation, args: Value) -> Result<ToolPayload, ToolError> {
        let span = tracing::info_span!("dispatch", operation = operation.name());
        async {
            let started = Instant::now();
            let result = self.execute(operation, args).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => debug!(elapsed_ms, "operation completed"),
                Err(e) => warn!(elapsed_ms, "operation failed: {e}"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, operation: Operation, args: Value) -> Result<ToolPayload, ToolError> {
        let mut args = normalize(args)?;
        let descriptor = schema::descriptor(operation);
        schema::validate(descriptor, &args)?;
        schema::coerce_integers(descriptor, &mut args);

        match operation {
            Operation::ListCoins => self.list_coins(parse(args)?),
            Operation::ResolveIds => self.resolve_ids(parse(args)?),
            Operation::Refresh => self.refresh().await,
            Operation::HistoricalData => self.historical(parse(args)?).await,
            Operation::OhlcData => self.ohlc(parse(args)?).await,
        }
    }

    fn list_coins(&self, args: ListCoinsArgs) -> Result<ToolPayload, ToolError> {
        let page = args.page.unwrap_or(1);
        let page_size = args.page_size.unwrap_or(DEFAULT_PAGE_SIZE as usize);
        let view = self.cache.page_view(page, page_size);

        Ok(ToolPayload::json(&CoinListing {
            coins: view.coins,
            pagination: Pagination {
                current_page: view.page,
                total_pages: view.total_pages,
                page_size: view.page_size,
                total_coins: view.total_coins,
            },
            last_updated: view.fetched_at.map(iso8601),
        })?)
    }

    fn resolve_ids(&self, args: ResolveIdsArgs) -> Result<ToolPayload, ToolError> {
        Ok(ToolPayload::json(&ResolvedIds(self.cache.find_ids(&args.names)))?)
    }

    async fn refresh(&self) -> Result<ToolPayload, ToolError> {
        let refreshed = self.cache.refresh().await?;
        Ok(ToolPayload::json(&RefreshSummary {
            message: REFRESH_MESSAGE,
            last_updated: iso8601(refreshed.fetched_at),
            total_coins: refreshed.coins,
        })?)
    }

    async fn historical(&self, args: HistoricalArgs) -> Result<ToolPayload, ToolError> {
        let time_range = time_range(args.from, args.to)?;
        let query = HistoricalQuery {
            id: args.id,
            vs_currency: args.target_currency,
            from: args.from,
            to: args.to,
            interval: args.interval,
        };
        let data = self.source.fetch_historical_range(&query).await?;

        Ok(ToolPayload::json(&HistoricalReport {
            interval: query.interval.map_or("auto", Into::into),
            id: query.id,
            target_currency: query.vs_currency,
            time_range,
            data,
        })?)
    }

    async fn ohlc(&self, args: OhlcArgs) -> Result<ToolPayload, ToolError> {
        let time_range = time_range(args.from, args.to)?;
        let query = OhlcQuery {
            id: args.id,
            vs_currency: args.target_currency,
            from: args.from,
            to: args.to,
            interval: args.interval,
        };
        let data = self.source.fetch_ohlc_range(&query).await?;

        Ok(ToolPayload::json(&OhlcReport {
            interval: query.interval.into(),
            id: query.id,
            target_currency: query.vs_currency,
            time_range,
            data,
        })?)
    }
}

/// `null` means no arguments; anything else must be an object.
fn normalize(args: Value) -> Result<Map<String, Value>, ToolError> {
    match args {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        _ => Err(ToolError::invalid("arguments", "must be an object")),
    }
}

fn parse<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ToolError::invalid("arguments", e.to_string()))
}

fn time_range(from: i64, to: i64) -> Result<TimeRange, ToolError> {
    let render = |field: &'static str, secs: i64| {
        unix_to_iso8601(secs).ok_or_else(|| ToolError::invalid(field, "is not a valid timestamp"))
    };
    Ok(TimeRange {
        from: render("from", from)?,
        to: render("to", to)?,
    })
}
