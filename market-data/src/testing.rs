//! Scripted [`MarketDataSource`] for tests and benches.

use crate::client::MarketDataSource;
use crate::error::UpstreamError;
use crate::model::{CoinRecord, HistoricalQuery, HistoricalSeries, OhlcBar, OhlcQuery};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory upstream. Serves whatever it was last given and records every query.
#[derive(Debug, Default)]
pub struct FakeSource {
    catalog: Mutex<Vec<CoinRecord>>,
    historical: Mutex<HistoricalSeries>,
    ohlc: Mutex<Vec<OhlcBar>>,
    failure: Mutex<Option<UpstreamError>>,
    catalog_calls: AtomicUsize,
    historical_queries: Mutex<Vec<HistoricalQuery>>,
    ohlc_queries: Mutex<Vec<OhlcQuery>>,
}

impl FakeSource {
    pub fn with_catalog(catalog: Vec<CoinRecord>) -> Self {
        let source = Self::default();
        source.set_catalog(catalog);
        source
    }

    pub fn set_catalog(&self, catalog: Vec<CoinRecord>) {
        *self.catalog.lock() = catalog;
        self.failure.lock().take();
    }

    pub fn set_historical(&self, series: HistoricalSeries) {
        *self.historical.lock() = series;
    }

    pub fn set_ohlc(&self, bars: Vec<OhlcBar>) {
        *self.ohlc.lock() = bars;
    }

    /// Every subsequent call fails with `err` until a new catalog is set.
    pub fn fail_with(&self, err: UpstreamError) {
        *self.failure.lock() = Some(err);
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn historical_queries(&self) -> Vec<HistoricalQuery> {
        self.historical_queries.lock().clone()
    }

    pub fn ohlc_queries(&self) -> Vec<OhlcQuery> {
        self.ohlc_queries.lock().clone()
    }

    /// Calls of any kind received so far.
    pub fn total_calls(&self) -> usize {
        self.catalog_calls() + self.historical_queries.lock().len() + self.ohlc_queries.lock().len()
    }

    fn check_failure(&self) -> Result<(), UpstreamError> {
        match self.failure.lock().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MarketDataSource for FakeSource {
    async fn fetch_catalog(&self) -> Result<Vec<CoinRecord>, UpstreamError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.catalog.lock().clone())
    }

    async fn fetch_historical_range(
        &self,
        query: &HistoricalQuery,
    ) -> Result<HistoricalSeries, UpstreamError> {
        self.historical_queries.lock().push(query.clone());
        self.check_failure()?;
        Ok(self.historical.lock().clone())
    }

    async fn fetch_ohlc_range(&self, query: &OhlcQuery) -> Result<Vec<OhlcBar>, UpstreamError> {
        self.ohlc_queries.lock().push(query.clone());
        self.check_failure()?;
        Ok(self.ohlc.lock().clone())
    }
}
