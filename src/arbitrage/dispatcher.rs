// src/arbitrage/dispatcher.rs

use std::sync::Arc;
use std::sync::atomic::{ AtomicUsize, Ordering };
use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::{ debug, warn };

use crate::models::triangle::Triangle;
use crate::quotes::store::QuoteStore;
use super::evaluator;
use super::result_map::ResultMap;

/// What a single dispatch did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub evaluated: usize,
    /// Triangles still waiting for one of their legs to be quoted
    pub skipped: usize,
    /// Evaluations aborted, previous result kept
    pub failed: usize,
    pub opportunities: usize,
}

/// Counters drained by the periodic stats task
#[derive(Debug, Default)]
pub struct DispatchStats {
    dispatches: AtomicUsize,
    evaluations: AtomicUsize,
    failures: AtomicUsize,
    opportunities: AtomicUsize,
}

/// Values of [`DispatchStats`] since the previous drain
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub dispatches: usize,
    pub evaluations: usize,
    pub failures: usize,
    pub opportunities: usize,
}

impl DispatchStats {
    #[inline]
    fn record(&self, outcome: &DispatchOutcome) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.evaluations.fetch_add(outcome.evaluated, Ordering::Relaxed);
        self.failures.fetch_add(outcome.failed, Ordering::Relaxed);
        self.opportunities.fetch_add(outcome.opportunities, Ordering::Relaxed);
    }

    /// Read and reset all counters
    pub fn take(&self) -> StatsSnapshot {
        StatsSnapshot {
            dispatches: self.dispatches.swap(0, Ordering::Relaxed),
            evaluations: self.evaluations.swap(0, Ordering::Relaxed),
            failures: self.failures.swap(0, Ordering::Relaxed),
            opportunities: self.opportunities.swap(0, Ordering::Relaxed),
        }
    }
}

/// Routes a quote update to the triangles that use the updated symbol.
///
/// The symbol index is built once from the triangle set and never mutated.
#[derive(Debug)]
pub struct UpdateDispatcher {
    triangles: Arc<[Arc<Triangle>]>,
    symbol_to_triangles: AHashMap<Arc<str>, SmallVec<[usize; 8]>>,
    stats: DispatchStats,
}

impl UpdateDispatcher {
    pub fn new(triangles: Arc<[Arc<Triangle>]>) -> Self {
        let mut symbol_to_triangles: AHashMap<Arc<str>, SmallVec<[usize; 8]>> =
            AHashMap::with_capacity(triangles.len() * 3);

        for (i, triangle) in triangles.iter().enumerate() {
            for leg in triangle.legs() {
                symbol_to_triangles.entry(Arc::clone(&leg.symbol)).or_default().push(i);
            }
        }

        debug!(
            "Indexed {} triangles over {} symbols",
            triangles.len(),
            symbol_to_triangles.len()
        );

        Self {
            triangles,
            symbol_to_triangles,
            stats: DispatchStats::default(),
        }
    }

    /// Indexes of the triangles that reference `symbol`
    #[inline]
    pub fn triangles_for(&self, symbol: &str) -> &[usize] {
        self.symbol_to_triangles
            .get(symbol)
            .map(|indices| indices.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.symbol_to_triangles.contains_key(symbol)
    }

    /// Every symbol referenced by at least one triangle
    pub fn symbols(&self) -> impl Iterator<Item = &Arc<str>> {
        self.symbol_to_triangles.keys()
    }

    #[inline]
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Re-evaluate every fully quoted triangle that uses `symbol` and publish
    /// the results. A failed evaluation leaves the triangle's previous result.
    pub fn dispatch(&self, symbol: &str, quotes: &QuoteStore, results: &ResultMap) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for &idx in self.triangles_for(symbol) {
            let Some(triangle) = self.triangles.get(idx) else {
                continue;
            };

            if !quotes.has_all(&triangle.symbols()) {
                outcome.skipped += 1;
                continue;
            }

            match evaluator::evaluate(triangle, quotes) {
                Ok(result) => {
                    if result.arbitrage_exists {
                        outcome.opportunities += 1;
                        debug!(
                            triangle = %triangle,
                            forward = %result.forward_rate,
                            backward = %result.backward_rate,
                            "Arbitrage opportunity"
                        );
                    }
                    results.publish(result);
                    outcome.evaluated += 1;
                }
                Err(err) => {
                    outcome.failed += 1;
                    warn!(triangle = %triangle.code(), "Evaluation aborted, keeping previous result: {}", err);
                }
            }
        }

        self.stats.record(&outcome);
        outcome
    }
}
