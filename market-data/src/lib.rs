//! CoinGecko market data: the upstream client and the in-memory coin catalog.

pub mod cache;
pub mod client;
mod error;
pub mod model;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use cache::{CacheState, CoinCache, IdMatch, PageView, Refreshed};
pub use client::{ApiPlan, CoinGeckoClient, CoinGeckoConfig, MarketDataSource};
pub use error::UpstreamError;
pub use model::{
    CoinRecord, HistoricalInterval, HistoricalQuery, HistoricalSeries, OhlcBar, OhlcInterval,
    OhlcQuery, SeriesPoint,
};
