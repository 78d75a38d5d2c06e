use std::sync::Arc;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::time::Instant;

use ahash::{ AHashMap, AHashSet };
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{ debug, info, warn };

use crate::models::trading_pair::{ Asset, TradingPair };
use crate::models::triangle::Triangle;

/// Why a 3-combination of pairs was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    AssetCount,
    Mirror,
    NoCycle,
}

#[derive(Debug, Default)]
struct RejectionCounters {
    asset_count: AtomicUsize,
    mirror: AtomicUsize,
    no_cycle: AtomicUsize,
}

impl RejectionCounters {
    #[inline]
    fn record(&self, rejection: Rejection) {
        let counter = match rejection {
            Rejection::AssetCount => &self.asset_count,
            Rejection::Mirror => &self.mirror,
            Rejection::NoCycle => &self.no_cycle,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// One-time combinatorial search for triangular cycles in a pair catalog
#[derive(Debug, Clone)]
pub struct TriangleFinder {
    target_assets: AHashSet<Asset>,
    max_pairs: usize,
}

impl TriangleFinder {
    pub fn new<I, S>(target_assets: I, max_pairs: usize) -> Self
        where I: IntoIterator<Item = S>, S: AsRef<str>
    {
        Self {
            target_assets: target_assets
                .into_iter()
                .map(|asset| Asset::from(asset.as_ref()))
                .collect(),
            max_pairs,
        }
    }

    /// Pairs touching a target asset, in catalog order, capped at `max_pairs`.
    /// A symbol listed twice is kept once.
    pub fn filter_pairs(&self, pairs: &[TradingPair]) -> Vec<Arc<TradingPair>> {
        let mut seen: AHashSet<&str> = AHashSet::with_capacity(self.max_pairs.min(pairs.len()));

        pairs
            .iter()
            .filter(|pair| {
                self.target_assets.contains(pair.base_asset.as_ref()) ||
                    self.target_assets.contains(pair.quote_asset.as_ref())
            })
            .filter(|pair| seen.insert(pair.symbol.as_ref()))
            .take(self.max_pairs)
            .map(|pair| Arc::new(pair.clone()))
            .collect()
    }

    /// Every valid triangle of the catalog, sorted by code.
    ///
    /// An empty result is a legitimate outcome (empty catalog, no overlap with
    /// the target assets) and is only logged.
    pub fn find(&self, pairs: &[TradingPair]) -> Vec<Arc<Triangle>> {
        let start = Instant::now();
        let candidates = self.filter_pairs(pairs);
        let n = candidates.len();

        info!(
            "Searching triangles over {} of {} pairs (target assets: {}, cap: {})",
            n,
            pairs.len(),
            self.target_assets.len(),
            self.max_pairs
        );

        if n < 3 {
            warn!("Fewer than 3 pairs touch the target assets, no triangle can be formed");
            return Vec::new();
        }

        let rejected = RejectionCounters::default();

        // Outer index split across the pool, combinations tagged for a stable order
        let mut accepted: Vec<((usize, usize, usize), Triangle)> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let mut found = Vec::new();
                for j in i + 1..n {
                    for k in j + 1..n {
                        let legs = [&candidates[i], &candidates[j], &candidates[k]];
                        match classify(legs) {
                            Ok(triangle) => found.push(((i, j, k), triangle)),
                            Err(rejection) => rejected.record(rejection),
                        }
                    }
                }
                found
            })
            .collect();

        accepted.sort_unstable_by_key(|(key, _)| *key);

        // Duplicate listings of one asset pair share a code, first in catalog order wins
        let mut by_code: AHashMap<Arc<str>, Arc<Triangle>> = AHashMap::with_capacity(
            accepted.len()
        );
        for (_, triangle) in accepted {
            if let Some(existing) = by_code.get(triangle.code()) {
                debug!("Dropping {} in favour of {}", triangle, existing);
                continue;
            }
            by_code.insert(Arc::clone(triangle.code()), Arc::new(triangle));
        }

        let mut triangles: Vec<Arc<Triangle>> = by_code
            .into_iter()
            .map(|(_, triangle)| triangle)
            .collect();
        triangles.sort_unstable_by(|a, b| a.code().cmp(b.code()));

        debug!(
            asset_count = rejected.asset_count.load(Ordering::Relaxed),
            mirror = rejected.mirror.load(Ordering::Relaxed),
            no_cycle = rejected.no_cycle.load(Ordering::Relaxed),
            "Rejected degenerate combinations"
        );

        if triangles.is_empty() {
            warn!("No triangles found among {} pairs", n);
        }

        info!("Found {} triangles in {:?}", triangles.len(), start.elapsed());

        triangles
    }
}

/// Validate a combination and build its canonical triangle
fn classify(legs: [&Arc<TradingPair>; 3]) -> Result<Triangle, Rejection> {
    if distinct_assets(&legs) != 3 {
        return Err(Rejection::AssetCount);
    }

    let [a, b, c] = legs;
    if a.is_mirror_of(b) || a.is_mirror_of(c) || b.is_mirror_of(c) {
        return Err(Rejection::Mirror);
    }

    Triangle::from_legs([Arc::clone(a), Arc::clone(b), Arc::clone(c)]).ok_or(Rejection::NoCycle)
}

#[inline]
fn distinct_assets(legs: &[&Arc<TradingPair>; 3]) -> usize {
    let mut seen: SmallVec<[&str; 6]> = SmallVec::new();
    for leg in legs {
        for asset in [leg.base_asset.as_ref(), leg.quote_asset.as_ref()] {
            if !seen.contains(&asset) {
                seen.push(asset);
            }
        }
    }
    seen.len()
}
