use async_trait::async_trait;

use crate::error::CatalogError;
use crate::models::trading_pair::TradingPair;

/// Source of the spot pair catalog
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Get the name of the exchange
    fn name(&self) -> &str;

    /// Fetch only active spot trading pairs
    async fn get_active_spot_symbols(&self) -> Result<Vec<TradingPair>, CatalogError>;

    /// Check if the exchange is reachable
    async fn is_operational(&self) -> bool;
}
