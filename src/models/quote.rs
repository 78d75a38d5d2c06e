use std::sync::Arc;

use rust_decimal::Decimal;

use crate::enums::side::Side;

/// Latest top of book for one symbol, replaced as a whole on every tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub ask: Decimal,
    pub bid: Decimal,
    /// Store-wide update counter, increases with every accepted tick
    pub sequence: u64,
}

impl Quote {
    #[inline]
    pub fn price(&self, side: Side) -> Decimal {
        match side {
            Side::Ask => self.ask,
            Side::Bid => self.bid,
        }
    }
}

/// Best bid/ask update pushed by the market-data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTick {
    pub symbol: Arc<str>,
    pub best_ask: Decimal,
    pub best_bid: Decimal,
}

impl BookTick {
    pub fn new(symbol: &str, best_ask: Decimal, best_bid: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            best_ask,
            best_bid,
        }
    }
}
