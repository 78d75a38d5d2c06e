// src/arbitrage/engine.rs

use std::sync::Arc;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::time::Duration;
use ahash::AHashSet;
use tokio::sync::{ mpsc, watch };
use tokio::task::JoinHandle;
use tracing::{ debug, info, trace };

use crate::error::CatalogError;
use crate::exchange::client::ExchangeClient;
use crate::models::quote::BookTick;
use crate::models::trading_pair::TradingPair;
use crate::models::triangle::Triangle;
use crate::quotes::store::QuoteStore;
use super::dispatcher::{ DispatchOutcome, DispatchStats, UpdateDispatcher };
use super::finder::TriangleFinder;
use super::result_map::ResultMap;

/// Triangle set, quote store, dispatcher and result map of one detector run
#[derive(Debug)]
pub struct ArbitrageEngine {
    triangles: Arc<[Arc<Triangle>]>,
    quotes: QuoteStore,
    dispatcher: UpdateDispatcher,
    results: ResultMap,
    ticks: AtomicUsize,
}

impl ArbitrageEngine {
    pub fn new(triangles: Vec<Arc<Triangle>>) -> Self {
        let triangles: Arc<[Arc<Triangle>]> = triangles.into();
        let results = ResultMap::new(triangles.iter());
        let dispatcher = UpdateDispatcher::new(Arc::clone(&triangles));
        let quotes = QuoteStore::with_capacity(dispatcher.symbols().count());

        Self {
            triangles,
            quotes,
            dispatcher,
            results,
            ticks: AtomicUsize::new(0),
        }
    }

    pub fn from_catalog(pairs: &[TradingPair], finder: &TriangleFinder) -> Self {
        Self::new(finder.find(pairs))
    }

    /// Fetch the catalog and build an engine over its triangles
    pub async fn discover(
        client: &dyn ExchangeClient,
        finder: &TriangleFinder
    ) -> Result<Self, CatalogError> {
        let pairs = client.get_active_spot_symbols().await?;
        info!("Fetched {} active spot pairs from {}", pairs.len(), client.name());
        Ok(Self::from_catalog(&pairs, finder))
    }

    #[inline]
    pub fn triangles(&self) -> &[Arc<Triangle>] {
        &self.triangles
    }

    /// Symbols the market-data source must stream, sorted
    pub fn subscription_symbols(&self) -> Vec<Arc<str>> {
        let mut symbols: Vec<Arc<str>> = self.dispatcher.symbols().cloned().collect();
        symbols.sort_unstable();
        symbols
    }

    #[inline]
    pub fn results(&self) -> &ResultMap {
        &self.results
    }

    #[inline]
    pub fn quotes(&self) -> &QuoteStore {
        &self.quotes
    }

    #[inline]
    pub fn stats(&self) -> &DispatchStats {
        self.dispatcher.stats()
    }

    /// Store the tick's quote. Returns false for symbols no triangle uses.
    pub fn ingest(&self, tick: &BookTick) -> bool {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if !self.dispatcher.is_tracked(&tick.symbol) {
            trace!("Ignoring tick for untracked symbol {}", tick.symbol);
            return false;
        }
        self.quotes.update(&tick.symbol, tick.best_ask, tick.best_bid);
        true
    }

    #[inline]
    pub fn dispatch(&self, symbol: &str) -> DispatchOutcome {
        self.dispatcher.dispatch(symbol, &self.quotes, &self.results)
    }

    /// Ingest and evaluate inline
    pub fn on_tick(&self, tick: &BookTick) -> DispatchOutcome {
        if !self.ingest(tick) {
            return DispatchOutcome::default();
        }
        self.dispatch(&tick.symbol)
    }

    /// Start the evaluation task.
    ///
    /// The returned sink stores quotes on the caller's side and only hands the
    /// symbol over, so the producer never waits on evaluation. The task ends
    /// once every sink clone is dropped and the queue is drained.
    pub fn spawn_evaluator(self: &Arc<Self>) -> (TickSink, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move { engine.run_evaluation_loop(rx).await });

        (TickSink { engine: Arc::clone(self), tx }, handle)
    }

    async fn run_evaluation_loop(&self, mut rx: mpsc::UnboundedReceiver<Arc<str>>) {
        let mut pending: AHashSet<Arc<str>> = AHashSet::new();

        while let Some(symbol) = rx.recv().await {
            pending.insert(symbol);

            // Coalesce a burst, each symbol is evaluated once against its latest quote
            while let Ok(symbol) = rx.try_recv() {
                pending.insert(symbol);
            }

            for symbol in pending.drain() {
                self.dispatch(&symbol);
            }
        }

        debug!("Evaluation loop stopped, tick queue closed");
    }

    /// Log dispatch counters every `period` until shutdown
    pub async fn run_stats_task(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let ticks = self.ticks.swap(0, Ordering::Relaxed);
            let stats = self.stats().take();
            info!(
                "Arbitrage stats: {} ticks received, {} updates dispatched, {} evaluations, {} aborted, {} opportunities, {}/{} triangles evaluated",
                ticks,
                stats.dispatches,
                stats.evaluations,
                stats.failures,
                stats.opportunities,
                self.results.evaluated_count(),
                self.results.len()
            );
        }
    }
}

/// Producer handle for the evaluation task
#[derive(Debug, Clone)]
pub struct TickSink {
    engine: Arc<ArbitrageEngine>,
    tx: mpsc::UnboundedSender<Arc<str>>,
}

impl TickSink {
    /// Store the quote and queue the symbol for evaluation
    pub fn push(&self, tick: BookTick) {
        if self.engine.ingest(&tick) && self.tx.send(tick.symbol).is_err() {
            debug!("Evaluation task has stopped, tick only stored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::models::arbitrage_result::TriangleStatus;

    fn pair(symbol: &str, base: &str, quote: &str) -> TradingPair {
        TradingPair::new(symbol, base, quote).unwrap()
    }

    fn catalog() -> Vec<TradingPair> {
        vec![
            pair("ETHBTC", "ETH", "BTC"),
            pair("BNBETH", "BNB", "ETH"),
            pair("BNBBTC", "BNB", "BTC"),
            pair("BTCUSDT", "BTC", "USDT"),
            pair("ETHUSDT", "ETH", "USDT"),
            pair("DOGEEUR", "DOGE", "EUR")
        ]
    }

    fn engine() -> ArbitrageEngine {
        let finder = TriangleFinder::new(["BTC", "ETH", "BNB", "USDT"], 400);
        ArbitrageEngine::from_catalog(&catalog(), &finder)
    }

    struct StaticCatalog(Vec<TradingPair>);

    #[async_trait]
    impl ExchangeClient for StaticCatalog {
        fn name(&self) -> &str {
            "static"
        }

        async fn get_active_spot_symbols(&self) -> Result<Vec<TradingPair>, CatalogError> {
            Ok(self.0.clone())
        }

        async fn is_operational(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_results_are_preallocated() {
        let engine = engine();

        let codes: Vec<String> = engine
            .triangles()
            .iter()
            .map(|t| t.code().to_string())
            .collect();
        assert_eq!(codes, vec!["BNB-ETH-BTC", "ETH-BTC-USDT"]);
        assert_eq!(engine.results().len(), 2);
        assert!(
            engine
                .results()
                .snapshot()
                .iter()
                .all(|(_, status)| **status == TriangleStatus::Pending)
        );
    }

    #[test]
    fn test_subscription_symbols_are_unique_and_sorted() {
        let engine = engine();

        let symbols: Vec<String> = engine
            .subscription_symbols()
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(symbols, vec!["BNBBTC", "BNBETH", "BTCUSDT", "ETHBTC", "ETHUSDT"]);
    }

    #[test]
    fn test_on_tick_flow() {
        let engine = engine();

        engine.on_tick(&BookTick::new("ETHBTC", dec!(0.05), dec!(0.0499)));
        engine.on_tick(&BookTick::new("BNBETH", dec!(0.15), dec!(0.149)));
        assert_eq!(engine.results().evaluated_count(), 0);

        let outcome = engine.on_tick(&BookTick::new("BNBBTC", dec!(0.0076), dec!(0.0075)));
        assert_eq!(outcome.evaluated, 1);

        let status = engine.results().get("BNB-ETH-BTC").unwrap();
        let result = status.result().unwrap();
        assert_eq!(result.forward_rate, dec!(1));
        assert!(!result.arbitrage_exists);
    }

    #[test]
    fn test_untracked_ticks_are_ignored() {
        let engine = engine();

        let outcome = engine.on_tick(&BookTick::new("DOGEEUR", dec!(0.1), dec!(0.09)));

        assert_eq!(outcome, DispatchOutcome::default());
        assert!(engine.quotes().get("DOGEEUR").is_none());
        assert!(engine.quotes().is_empty());
    }

    #[tokio::test]
    async fn test_discover_from_client() {
        let client = StaticCatalog(catalog());
        let finder = TriangleFinder::new(["BNB", "ETH"], 400);

        let engine = ArbitrageEngine::discover(&client, &finder).await.unwrap();

        assert_eq!(engine.triangles().len(), 1);
        assert_eq!(engine.triangles()[0].code().as_ref(), "BNB-ETH-BTC");
    }

    #[tokio::test]
    async fn test_evaluator_task_publishes_latest_quotes() {
        let engine = Arc::new(engine());
        let (sink, handle) = engine.spawn_evaluator();

        sink.push(BookTick::new("ETHBTC", dec!(0.05), dec!(0.0499)));
        sink.push(BookTick::new("BNBETH", dec!(0.15), dec!(0.149)));
        sink.push(BookTick::new("BNBBTC", dec!(0.0076), dec!(0.0075)));
        sink.push(BookTick::new("BNBBTC", dec!(0.0061), dec!(0.006)));
        drop(sink);

        handle.await.unwrap();

        let status = engine.results().get("BNB-ETH-BTC").unwrap();
        let result = status.result().unwrap();
        assert_eq!(result.bid_legs[2].price, dec!(0.006));
        assert_eq!(result.sequence, engine.quotes().last_sequence());
    }
}
