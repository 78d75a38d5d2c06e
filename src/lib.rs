//! Real-time triangular arbitrage detection over Binance spot book tickers.
//!
//! The catalog is searched once for triangles ([`arbitrage::finder`]), every
//! book ticker update lands in the [`quotes::store::QuoteStore`] and re-evaluates
//! only the triangles using the updated symbol, publishing into the
//! [`arbitrage::result_map::ResultMap`].

pub mod app;
pub mod arbitrage;
pub mod config;
pub mod enums;
pub mod error;
pub mod exchange;
pub mod models;
pub mod quotes;
pub mod utils;
