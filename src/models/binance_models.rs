use serde::{ Deserialize, Serialize };

/// Response of `GET /api/v3/exchangeInfo`.
///
/// Records are kept raw and decoded one by one, a malformed entry is skipped
/// instead of failing the whole catalog.
#[derive(Debug, Deserialize)]
pub struct BinanceExchangeInfo {
    pub symbols: Vec<serde_json::Value>,
}

/// Catalog record, only the fields the detector needs
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BinanceSymbol {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub is_spot_trading_allowed: bool,
}

impl BinanceSymbol {
    #[inline]
    pub fn is_active_spot(&self) -> bool {
        self.status == "TRADING" && self.is_spot_trading_allowed
    }
}

/// `<symbol>@bookTicker` payload
#[derive(Debug, Deserialize, Clone)]
pub struct BookTickerEvent {
    #[serde(rename = "u")]
    pub update_id: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bid_price: String,
    #[serde(rename = "B")]
    pub bid_qty: String,
    #[serde(rename = "a")]
    pub ask_price: String,
    #[serde(rename = "A")]
    pub ask_qty: String,
}

/// Envelope of the combined stream endpoint
#[derive(Debug, Deserialize)]
pub struct CombinedStreamEvent<T> {
    pub stream: String,
    pub data: T,
}

/// Websocket message for subscribing to streams
#[derive(Debug, Serialize)]
pub struct StreamSubscription {
    pub method: &'static str,
    pub params: Vec<String>,
    pub id: u64,
}

/// Reply to a subscription request
#[derive(Debug, Deserialize)]
pub struct SubscriptionResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    pub id: u64,
}

/// Anything the combined stream can send as text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    BookTicker(CombinedStreamEvent<BookTickerEvent>),
    Response(SubscriptionResponse),
}
