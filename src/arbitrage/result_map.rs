use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::warn;

use crate::models::arbitrage_result::{ ArbitrageResult, TriangleStatus };
use crate::models::triangle::Triangle;

/// Latest result per triangle code.
///
/// Keys are fixed when the map is built, every triangle starts as
/// [`TriangleStatus::Pending`]. Each entry has its own lock around an `Arc`
/// that is replaced whole, so readers of one triangle never contend with
/// writers of another and never see a half-written result.
#[derive(Debug, Default)]
pub struct ResultMap {
    entries: AHashMap<Arc<str>, RwLock<Arc<TriangleStatus>>>,
}

impl ResultMap {
    pub fn new<'a, I>(triangles: I) -> Self where I: IntoIterator<Item = &'a Arc<Triangle>> {
        let pending = Arc::new(TriangleStatus::Pending);

        let entries = triangles
            .into_iter()
            .map(|triangle| (Arc::clone(triangle.code()), RwLock::new(Arc::clone(&pending))))
            .collect();

        Self { entries }
    }

    /// Overwrite the entry for the result's triangle. Unknown codes are ignored.
    pub(crate) fn publish(&self, result: ArbitrageResult) -> bool {
        match self.entries.get(&result.triangle_code) {
            Some(slot) => {
                *slot.write() = Arc::new(TriangleStatus::Evaluated(result));
                true
            }
            None => {
                warn!("Ignoring result for unknown triangle {}", result.triangle_code);
                false
            }
        }
    }

    #[inline]
    pub fn get(&self, code: &str) -> Option<Arc<TriangleStatus>> {
        self.entries.get(code).map(|slot| slot.read().clone())
    }

    /// All entries sorted by triangle code
    pub fn snapshot(&self) -> Vec<(Arc<str>, Arc<TriangleStatus>)> {
        let mut entries: Vec<_> = self.entries
            .iter()
            .map(|(code, slot)| (Arc::clone(code), slot.read().clone()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Results currently flagged as opportunities, sorted by triangle code
    pub fn opportunities(&self) -> Vec<ArbitrageResult> {
        self.snapshot()
            .into_iter()
            .filter_map(|(_, status)| status.result().filter(|r| r.arbitrage_exists).cloned())
            .collect()
    }

    pub fn evaluated_count(&self) -> usize {
        self.entries
            .values()
            .filter(|slot| !matches!(**slot.read(), TriangleStatus::Pending))
            .count()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
