use std::sync::Arc;

use chrono::{ DateTime, Utc };
use rust_decimal::Decimal;

/// Price of one leg as it entered an evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegPrice {
    pub symbol: Arc<str>,
    pub price: Decimal,
}

/// Outcome of evaluating one triangle against the current quotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitrageResult {
    pub triangle_code: Arc<str>,
    /// Asks of AB, BC and the closing leg
    pub ask_legs: [LegPrice; 3],
    /// Bids of AB, BC and the closing leg
    pub bid_legs: [LegPrice; 3],
    /// Cost in A of buying around the cycle, below 1 is profitable
    pub forward_rate: Decimal,
    /// Proceeds in A of selling around the cycle, above 1 is profitable
    pub backward_rate: Decimal,
    pub arbitrage_exists: bool,
    /// Highest quote sequence among the three legs
    pub sequence: u64,
    pub evaluated_at: DateTime<Utc>,
}

/// Result map entry. `Pending` until the triangle has been fully quoted once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TriangleStatus {
    #[default]
    Pending,
    Evaluated(ArbitrageResult),
}

impl TriangleStatus {
    #[inline]
    pub fn result(&self) -> Option<&ArbitrageResult> {
        match self {
            TriangleStatus::Pending => None,
            TriangleStatus::Evaluated(result) => Some(result),
        }
    }

    #[inline]
    pub fn is_opportunity(&self) -> bool {
        self.result().is_some_and(|r| r.arbitrage_exists)
    }
}
