pub mod binance;
pub mod client;
pub mod stream;
