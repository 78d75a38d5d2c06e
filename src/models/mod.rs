pub mod arbitrage_result;
pub mod binance_models;
pub mod quote;
pub mod trading_pair;
pub mod triangle;
