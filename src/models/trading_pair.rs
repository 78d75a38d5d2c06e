use std::fmt;
use std::sync::Arc;

use crate::error::PairError;

/// Asset code such as "BTC"
pub type Asset = Arc<str>;

/// Joins asset codes in a triangle code, so it can never appear inside one
pub const CODE_SEPARATOR: char = '-';

/// Spot trading pair from the exchange catalog, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradingPair {
    pub symbol: Arc<str>, // Using Arc<str> to reduce clone costs
    pub base_asset: Asset,
    pub quote_asset: Asset,
}

impl TradingPair {
    pub fn new(symbol: &str, base_asset: &str, quote_asset: &str) -> Result<Self, PairError> {
        if symbol.is_empty() {
            return Err(PairError::EmptySymbol);
        }

        for asset in [base_asset, quote_asset] {
            if asset.is_empty() || asset.contains(CODE_SEPARATOR) {
                return Err(PairError::InvalidAsset {
                    symbol: symbol.to_string(),
                    asset: asset.to_string(),
                });
            }
        }

        if base_asset == quote_asset {
            return Err(PairError::SameAsset {
                symbol: symbol.to_string(),
                asset: base_asset.to_string(),
            });
        }

        Ok(Self {
            symbol: symbol.into(),
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
        })
    }

    #[inline]
    pub fn has_asset(&self, asset: &str) -> bool {
        self.base_asset.as_ref() == asset || self.quote_asset.as_ref() == asset
    }

    /// Same two assets with base and quote swapped, e.g. A/B against B/A
    #[inline]
    pub fn is_mirror_of(&self, other: &TradingPair) -> bool {
        self.base_asset == other.quote_asset && self.quote_asset == other.base_asset
    }
}

impl fmt::Display for TradingPair {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.symbol, self.base_asset, self.quote_asset)
    }
}
