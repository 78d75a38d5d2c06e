use async_trait::async_trait;
use reqwest::{ Client as HttpClient, Url };
use std::time::{ Duration, Instant };
use tracing::{ debug, error, info, warn };

use crate::error::CatalogError;
use crate::exchange::client::ExchangeClient;
use crate::models::binance_models::{ BinanceExchangeInfo, BinanceSymbol };
use crate::models::trading_pair::TradingPair;

const API_URL: &str = "https://api.binance.com/api/";
const TESTNET_API_URL: &str = "https://testnet.binance.vision/api/";

/// Public REST endpoints of Binance spot, no credentials needed
#[derive(Debug, Clone)]
pub struct BinanceClient {
    http: HttpClient,

    /// Base URL for API requests
    base_url: Url,

    /// Whether to use the testnet
    testnet: bool,
}

impl BinanceClient {
    pub fn new(testnet: bool) -> Result<Self, CatalogError> {
        let base_url = Url::parse(if testnet { TESTNET_API_URL } else { API_URL })?;
        Self::with_base_url(base_url, testnet)
    }

    pub fn with_base_url(base_url: Url, testnet: bool) -> Result<Self, CatalogError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            http,
            base_url,
            testnet,
        })
    }
}

/// Decode an exchangeInfo body into the active spot pairs.
///
/// Records that do not decode or fail pair validation are logged and skipped.
pub fn parse_exchange_info(body: &str) -> Result<Vec<TradingPair>, CatalogError> {
    let info: BinanceExchangeInfo = serde_json::from_str(body)?;
    let total = info.symbols.len();

    let mut pairs = Vec::with_capacity(total);
    let mut skipped = 0usize;

    for raw in info.symbols {
        let record: BinanceSymbol = match serde_json::from_value(raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping undecodable catalog record: {}", e);
                skipped += 1;
                continue;
            }
        };

        if !record.is_active_spot() {
            continue;
        }

        match TradingPair::new(&record.symbol, &record.base_asset, &record.quote_asset) {
            Ok(pair) => pairs.push(pair),
            Err(e) => {
                warn!("Skipping catalog record {}: {}", record.symbol, e);
                skipped += 1;
            }
        }
    }

    debug!("Catalog: {} records, {} active spot pairs, {} skipped", total, pairs.len(), skipped);

    Ok(pairs)
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    fn name(&self) -> &str {
        if self.testnet { "Binance Testnet" } else { "Binance" }
    }

    async fn get_active_spot_symbols(&self) -> Result<Vec<TradingPair>, CatalogError> {
        let start = Instant::now();
        debug!("Fetching exchange info from {}", self.base_url);

        let url = self.base_url.join("v3/exchangeInfo")?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Binance API error: {} - {}", status, body);
            return Err(CatalogError::Status { status: status.as_u16(), body });
        }

        let body = response.text().await?;
        let pairs = parse_exchange_info(&body)?;

        info!("Fetched {} active spot pairs from {} in {:.2?}", pairs.len(), self.name(), start.elapsed());

        Ok(pairs)
    }

    async fn is_operational(&self) -> bool {
        let Ok(url) = self.base_url.join("v3/ping") else {
            return false;
        };

        match self.http.get(url).timeout(Duration::from_secs(2)).send().await {
            Ok(res) => res.status().is_success(),
            Err(_) => false,
        }
    }
}
