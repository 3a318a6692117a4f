//! In-memory coin catalog.
//!
//! The cache holds one immutable [`CacheSnapshot`] behind an `Arc`. A refresh fetches the
//! full catalog first and only then swaps the pointer, so readers always work against a
//! complete snapshot (old or new) and a failed refresh leaves everything as it was.
//! Concurrent refreshes are not coordinated: whichever finishes last wins.

use crate::client::MarketDataSource;
use crate::error::UpstreamError;
use crate::model::CoinRecord;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// The catalog as of one successful refresh.
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    /// Upstream order, not re-sorted.
    pub coins: Vec<CoinRecord>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Lowercased `(name, symbol)` per coin, index-aligned with `coins`.
    search_keys: Vec<(String, String)>,
}

impl CacheSnapshot {
    fn new(coins: Vec<CoinRecord>, fetched_at: DateTime<Utc>) -> Self {
        let search_keys = coins.iter().map(CoinRecord::search_keys).collect();
        Self {
            coins,
            fetched_at: Some(fetched_at),
            search_keys,
        }
    }

    /// First coin, in snapshot order, whose name or symbol equals `needle`.
    /// `needle` must already be lowercased.
    fn find(&self, needle: &str) -> Option<&CoinRecord> {
        self.coins
            .iter()
            .zip(&self.search_keys)
            .find(|(_, (name, symbol))| name == needle || symbol == needle)
            .map(|(coin, _)| coin)
    }
}

/// Outcome of a successful [`CoinCache::refresh`], taken from the snapshot it installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refreshed {
    pub fetched_at: DateTime<Utc>,
    pub coins: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No refresh has succeeded yet.
    Empty,
    Populated { fetched_at: DateTime<Utc> },
}

/// Result of resolving one name or symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdMatch {
    pub name: String,
    pub id: Option<String>,
}

/// One page plus the pagination figures, all taken from the same snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub coins: Vec<CoinRecord>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_coins: usize,
    pub fetched_at: Option<DateTime<Utc>>,
}

pub struct CoinCache {
    source: Arc<dyn MarketDataSource>,
    snapshot: RwLock<Arc<CacheSnapshot>>,
}

impl std::fmt::Debug for CoinCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("CoinCache")
            .field("coins", &snapshot.coins.len())
            .field("fetched_at", &snapshot.fetched_at)
            .finish()
    }
}

impl CoinCache {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(CacheSnapshot::default())),
        }
    }

    /// Current snapshot. Cheap: clones the `Arc`, the lock is released immediately.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Re-fetches the whole catalog and replaces the snapshot.
    ///
    /// On error the previous snapshot and timestamp stay in place.
    /// The returned figures describe the snapshot this call installed, even if another
    /// refresh replaces it before the caller looks.
    pub async fn refresh(&self) -> Result<Refreshed, UpstreamError> {
        let coins = self
            .source
            .fetch_catalog()
            .await
            .inspect_err(|e| warn!("coin cache: refresh failed, keeping previous snapshot: {e}"))?;

        let refreshed = Refreshed {
            fetched_at: Utc::now(),
            coins: coins.len(),
        };
        let fresh = Arc::new(CacheSnapshot::new(coins, refreshed.fetched_at));
        *self.snapshot.write() = fresh;

        info!(coins = refreshed.coins, "coin cache: refreshed");
        Ok(refreshed)
    }

    /// Records on 1-indexed `page` of size `page_size`.
    ///
    /// Pages past the end (and a zero page or page size) yield an empty vector.
    pub fn page(&self, page: usize, page_size: usize) -> Vec<CoinRecord> {
        page_slice(&self.snapshot().coins, page, page_size)
    }

    /// `ceil(len / page_size)`; 0 for an empty cache.
    pub fn total_pages(&self, page_size: usize) -> usize {
        page_count(self.len(), page_size)
    }

    /// [`Self::page`] together with its pagination metadata, consistent even if a refresh
    /// lands in between.
    pub fn page_view(&self, page: usize, page_size: usize) -> PageView {
        let snapshot = self.snapshot();
        PageView {
            coins: page_slice(&snapshot.coins, page, page_size),
            page,
            page_size,
            total_pages: page_count(snapshot.coins.len(), page_size),
            total_coins: snapshot.coins.len(),
            fetched_at: snapshot.fetched_at,
        }
    }

    /// Resolves each name to the id of the first record, in snapshot order, whose name or
    /// symbol equals it case-insensitively.
    ///
    /// Names and symbols collide across records (several tokens share `eth`, for
    /// instance); the earliest record in upstream order wins. No partial matching.
    pub fn find_ids<S: AsRef<str>>(&self, names: &[S]) -> Vec<IdMatch> {
        let snapshot = self.snapshot();
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let needle = name.to_lowercase();
                let id = snapshot.find(&needle).map(|coin| coin.id.clone());
                IdMatch {
                    name: name.to_string(),
                    id,
                }
            })
            .collect()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().fetched_at
    }

    pub fn state(&self) -> CacheState {
        match self.last_updated() {
            None => CacheState::Empty,
            Some(fetched_at) => CacheState::Populated { fetched_at },
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn page_slice(coins: &[CoinRecord], page: usize, page_size: usize) -> Vec<CoinRecord> {
    if page == 0 || page_size == 0 {
        return Vec::new();
    }
    let start = (page - 1).saturating_mul(page_size);
    coins.iter().skip(start).take(page_size).cloned().collect()
}

fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HistoricalQuery, HistoricalSeries, OhlcBar, OhlcQuery};
    use crate::testing::FakeSource;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tokio::sync::{mpsc, Notify};

    fn coins(n: usize) -> Vec<CoinRecord> {
        (0..n)
            .map(|i| CoinRecord::new(format!("coin-{i}"), format!("c{i}"), format!("Coin {i}")))
            .collect()
    }

    async fn populated(catalog: Vec<CoinRecord>) -> (Arc<FakeSource>, CoinCache) {
        let source = Arc::new(FakeSource::with_catalog(catalog));
        let cache = CoinCache::new(source.clone());
        cache.refresh().await.unwrap();
        (source, cache)
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = CoinCache::new(Arc::new(FakeSource::default()));
        assert_eq!(cache.state(), CacheState::Empty);
        assert_eq!(cache.last_updated(), None);
        assert_eq!(cache.total_pages(10), 0);
        assert!(cache.page(1, 10).is_empty());
        assert_eq!(
            cache.find_ids(&["btc"]),
            vec![IdMatch {
                name: "btc".into(),
                id: None
            }]
        );
    }

    #[tokio::test]
    async fn pages_reassemble_the_snapshot() {
        let catalog = coins(23);
        let (_, cache) = populated(catalog.clone()).await;

        for page_size in [1, 2, 5, 7, 10, 23, 24, 1000] {
            let total = cache.total_pages(page_size);
            assert_eq!(total, catalog.len().div_ceil(page_size));

            let mut all = Vec::new();
            for page in 1..=total {
                let chunk = cache.page(page, page_size);
                assert!(chunk.len() <= page_size);
                assert!(!chunk.is_empty());
                all.extend(chunk);
            }
            assert_eq!(all, catalog, "page_size {page_size}");
        }
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let (_, cache) = populated(coins(5)).await;
        assert_eq!(cache.total_pages(2), 3);
        assert_eq!(cache.page(3, 2).len(), 1);
        assert!(cache.page(4, 2).is_empty());
        assert!(cache.page(usize::MAX, 1000).is_empty());
        assert!(cache.page(0, 2).is_empty());
        assert!(cache.page(1, 0).is_empty());
        assert_eq!(cache.total_pages(0), 0);
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive_on_symbol_and_name() {
        let (_, cache) = populated(vec![
            CoinRecord::new("ethereum", "eth", "Ethereum"),
            CoinRecord::new("bitcoin", "btc", "Bitcoin"),
        ])
        .await;

        let found = cache.find_ids(&["BTC", "bitcoin", "doesnotexist"]);
        assert_eq!(
            found,
            vec![
                IdMatch {
                    name: "BTC".into(),
                    id: Some("bitcoin".into())
                },
                IdMatch {
                    name: "bitcoin".into(),
                    id: Some("bitcoin".into())
                },
                IdMatch {
                    name: "doesnotexist".into(),
                    id: None
                },
            ]
        );
        assert_eq!(cache.find_ids(&["bit"])[0].id, None);
        assert_eq!(cache.find_ids(&["Bitcoin "])[0].id, None);
    }

    #[tokio::test]
    async fn first_record_in_snapshot_order_wins() {
        let (_, cache) = populated(vec![
            CoinRecord::new("ethereum", "eth", "Ethereum"),
            CoinRecord::new("bridged-ether", "eth", "Bridged Ether"),
            CoinRecord::new("eth-token", "ethtoken", "ETH"),
        ])
        .await;

        assert_eq!(cache.find_ids(&["ETH"])[0].id.as_deref(), Some("ethereum"));
        assert_eq!(
            cache.find_ids(&["bridged ether"])[0].id.as_deref(),
            Some("bridged-ether")
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let (source, cache) = populated(vec![CoinRecord::new("bitcoin", "btc", "Bitcoin")]).await;
        let before = cache.last_updated();
        let page_before = cache.page(1, 10);

        source.fail_with(UpstreamError::with_status(500, "boom"));
        let err = cache.refresh().await.unwrap_err();

        assert_eq!(err.status, Some(500));
        assert_eq!(cache.last_updated(), before);
        assert_eq!(cache.page(1, 10), page_before);
        assert_eq!(cache.find_ids(&["btc"])[0].id.as_deref(), Some("bitcoin"));
        assert!(matches!(cache.state(), CacheState::Populated { .. }));
    }

    #[tokio::test]
    async fn failed_first_refresh_stays_empty() {
        let source = Arc::new(FakeSource::default());
        source.fail_with(UpstreamError::new("connection refused"));
        let cache = CoinCache::new(source);

        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.state(), CacheState::Empty);
    }

    #[tokio::test]
    async fn successful_refresh_replaces_everything() {
        let (source, cache) = populated(vec![
            CoinRecord::new("bitcoin", "btc", "Bitcoin"),
            CoinRecord::new("dead-coin", "dead", "Dead Coin"),
        ])
        .await;
        let first = cache.last_updated().unwrap();

        source.set_catalog(vec![CoinRecord::new("bitcoin", "btc", "Bitcoin")]);
        let second = cache.refresh().await.unwrap();

        assert!(second.fetched_at >= first);
        assert_eq!(cache.last_updated(), Some(second.fetched_at));
        assert_eq!(second.coins, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.find_ids(&["dead"])[0].id, None);
        assert!(cache.page(1, 10).iter().all(|c| c.id != "dead-coin"));
        assert_eq!(source.catalog_calls(), 2);
    }

    #[tokio::test]
    async fn page_view_matches_individual_queries() {
        let (_, cache) = populated(coins(12)).await;
        let view = cache.page_view(2, 5);

        assert_eq!(view.coins, cache.page(2, 5));
        assert_eq!(view.total_pages, 3);
        assert_eq!(view.total_coins, 12);
        assert_eq!(view.fetched_at, cache.last_updated());
    }

    #[tokio::test]
    async fn readers_keep_their_snapshot_across_a_refresh() {
        let (source, cache) = populated(coins(3)).await;
        let held = cache.snapshot();

        source.set_catalog(coins(1));
        cache.refresh().await.unwrap();

        assert_eq!(held.coins.len(), 3);
        assert_eq!(cache.len(), 1);
    }

    /// Catalog source whose fetches block until released, one gate per scripted fetch.
    struct GatedSource {
        scripted: Mutex<VecDeque<(Vec<CoinRecord>, Arc<Notify>)>>,
        started: mpsc::UnboundedSender<usize>,
    }

    impl GatedSource {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<usize>) {
            let (started, rx) = mpsc::unbounded_channel();
            let source = Self {
                scripted: Mutex::new(VecDeque::new()),
                started,
            };
            (Arc::new(source), rx)
        }

        /// Queues the catalog for the next fetch and returns the gate that releases it.
        fn script(&self, catalog: Vec<CoinRecord>) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.scripted.lock().push_back((catalog, Arc::clone(&gate)));
            gate
        }
    }

    #[async_trait]
    impl MarketDataSource for GatedSource {
        async fn fetch_catalog(&self) -> Result<Vec<CoinRecord>, UpstreamError> {
            let (catalog, gate) = self
                .scripted
                .lock()
                .pop_front()
                .ok_or_else(|| UpstreamError::new("nothing scripted"))?;
            let _ = self.started.send(catalog.len());
            gate.notified().await;
            Ok(catalog)
        }

        async fn fetch_historical_range(
            &self,
            _: &HistoricalQuery,
        ) -> Result<HistoricalSeries, UpstreamError> {
            Err(UpstreamError::new("catalog only"))
        }

        async fn fetch_ohlc_range(&self, _: &OhlcQuery) -> Result<Vec<OhlcBar>, UpstreamError> {
            Err(UpstreamError::new("catalog only"))
        }
    }

    #[tokio::test]
    async fn reads_during_a_refresh_see_a_whole_snapshot() {
        let (source, mut started) = GatedSource::new();
        let cache = Arc::new(CoinCache::new(source.clone()));

        let first = source.script(coins(3));
        let task = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.refresh().await }
        });
        assert_eq!(started.recv().await, Some(3));
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.page(1, 10).is_empty());
        assert_eq!(cache.find_ids(&["c0"])[0].id, None);

        first.notify_one();
        assert_eq!(task.await.unwrap().unwrap().coins, 3);
        let populated_at = cache.last_updated();

        let second = source.script(coins(1));
        let task = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.refresh().await }
        });
        assert_eq!(started.recv().await, Some(1));
        let view = cache.page_view(1, 10);
        assert_eq!(view.coins, coins(3));
        assert_eq!(view.total_coins, 3);
        assert_eq!(view.fetched_at, populated_at);
        assert_eq!(cache.find_ids(&["C2"])[0].id.as_deref(), Some("coin-2"));

        second.notify_one();
        let refreshed = task.await.unwrap().unwrap();
        assert_eq!(cache.page(1, 10), coins(1));
        assert_eq!(cache.last_updated(), Some(refreshed.fetched_at));
        assert_eq!(cache.find_ids(&["c2"])[0].id, None);
    }

    #[tokio::test]
    async fn overlapping_refreshes_last_to_finish_wins() {
        let (source, mut started) = GatedSource::new();
        let cache = Arc::new(CoinCache::new(source.clone()));

        let slow = source.script(coins(5));
        let fast = source.script(coins(2));
        let spawn_refresh = || {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.refresh().await })
        };
        let slow_task = spawn_refresh();
        assert_eq!(started.recv().await, Some(5));
        let fast_task = spawn_refresh();
        assert_eq!(started.recv().await, Some(2));

        fast.notify_one();
        let fast_result = fast_task.await.unwrap().unwrap();
        assert_eq!(cache.len(), 2);

        slow.notify_one();
        let slow_result = slow_task.await.unwrap().unwrap();
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.last_updated(), Some(slow_result.fetched_at));
        // Each result still describes the snapshot its own call installed.
        assert_eq!((fast_result.coins, slow_result.coins), (2, 5));
        assert!(fast_result.fetched_at <= slow_result.fetched_at);
    }
}
