//! Error types for the detector

use rust_decimal::Decimal;
use thiserror::Error;

use crate::enums::side::Side;

/// Malformed catalog record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairError {
    #[error("Trading pair has an empty symbol")]
    EmptySymbol,

    #[error("Invalid asset code {asset:?} in symbol {symbol}")]
    InvalidAsset {
        symbol: String,
        asset: String,
    },

    #[error("Symbol {symbol} trades {asset} against itself")]
    SameAsset {
        symbol: String,
        asset: String,
    },
}

/// Triangle code that does not describe three distinct assets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriangleCodeError {
    #[error("Triangle code {0:?} must contain exactly three assets")]
    WrongArity(String),

    #[error("Triangle code {0:?} contains an empty asset")]
    EmptyAsset(String),

    #[error("Triangle code {0:?} repeats an asset")]
    RepeatedAsset(String),
}

/// Catalog source failures, fatal to startup
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to reach exchange: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Exchange API error: {status} - {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("Malformed exchange info: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid exchange URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Reasons a triangle evaluation is aborted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("No quote for {0}")]
    MissingQuote(String),

    #[error("Invalid {side} price {price} for {symbol}")]
    InvalidQuote {
        symbol: String,
        side: Side,
        price: Decimal,
    },

    #[error("Decimal overflow while evaluating {0}")]
    Arithmetic(String),
}

/// Market-data transport failures
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Websocket error: {0}")]
    Websocket(#[from] tungstenite::Error),

    #[error("Subscription rejected: {0}")]
    Subscription(String),

    #[error("{requested} streams requested, a connection carries at most {limit}")]
    TooManyStreams {
        requested: usize,
        limit: usize,
    },

    #[error("Malformed tick for {symbol}: {reason}")]
    MalformedTick {
        symbol: String,
        reason: String,
    },

    #[error("Undecodable stream message: {0}")]
    Decode(#[from] serde_json::Error),
}
