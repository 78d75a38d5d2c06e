// src/quotes/store.rs

use std::sync::Arc;
use std::sync::atomic::{ AtomicU64, Ordering };
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;

use crate::models::quote::Quote;

/// Latest top of book per symbol.
///
/// Each entry is an `Arc<Quote>` swapped in whole, so a reader holds either the
/// previous or the new quote and never a mix. Locking is per shard, there is
/// no lock over the whole store.
#[derive(Debug, Default)]
pub struct QuoteStore {
    quotes: DashMap<Arc<str>, Arc<Quote>>,
    sequence: AtomicU64,
}

impl QuoteStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for a known subscription set
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            quotes: DashMap::with_capacity(capacity),
            sequence: AtomicU64::new(0),
        }
    }

    /// Replace the quote for `symbol`.
    /// The sequence is drawn while the entry is locked, so per symbol it only grows.
    pub fn update(&self, symbol: &Arc<str>, ask: Decimal, bid: Decimal) -> Arc<Quote> {
        match self.quotes.entry(Arc::clone(symbol)) {
            Entry::Occupied(mut occupied) => {
                let quote = self.next_quote(ask, bid);
                occupied.insert(Arc::clone(&quote));
                quote
            }
            Entry::Vacant(vacant) => {
                let quote = self.next_quote(ask, bid);
                vacant.insert(Arc::clone(&quote));
                quote
            }
        }
    }

    #[inline]
    fn next_quote(&self, ask: Decimal, bid: Decimal) -> Arc<Quote> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Arc::new(Quote { ask, bid, sequence })
    }

    /// `None` when the symbol has never been quoted
    #[inline]
    pub fn get(&self, symbol: &str) -> Option<Arc<Quote>> {
        self.quotes.get(symbol).map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn contains(&self, symbol: &str) -> bool {
        self.quotes.contains_key(symbol)
    }

    /// True once every symbol has been quoted at least once
    #[inline]
    pub fn has_all(&self, symbols: &[&str]) -> bool {
        symbols.iter().all(|symbol| self.contains(symbol))
    }

    #[inline]
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_absent_is_not_zero() {
        let store = QuoteStore::new();
        let zero: Arc<str> = "ZEROUSDT".into();

        assert!(store.get("ETHBTC").is_none());

        store.update(&zero, Decimal::ZERO, Decimal::ZERO);
        let quote = store.get("ZEROUSDT").unwrap();
        assert_eq!(quote.ask, Decimal::ZERO);
        assert!(store.contains("ZEROUSDT"));
        assert!(!store.contains("ETHBTC"));
    }

    #[test]
    fn test_update_overwrites_and_sequences_grow() {
        let store = QuoteStore::with_capacity(4);
        let ethbtc: Arc<str> = "ETHBTC".into();
        let bnbbtc: Arc<str> = "BNBBTC".into();

        let first = store.update(&ethbtc, dec!(0.05), dec!(0.0499));
        let other = store.update(&bnbbtc, dec!(0.0076), dec!(0.0075));
        let second = store.update(&ethbtc, dec!(0.051), dec!(0.0505));

        assert!(first.sequence < other.sequence);
        assert!(other.sequence < second.sequence);
        assert_eq!(store.last_sequence(), second.sequence);

        let current = store.get("ETHBTC").unwrap();
        assert_eq!(*current, *second);
        assert_eq!(current.bid, dec!(0.0505));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_has_all_requires_every_symbol() {
        let store = QuoteStore::new();
        let symbols = ["ETHBTC", "BNBETH", "BNBBTC"];
        assert!(!store.has_all(&symbols));

        store.update(&"ETHBTC".into(), dec!(0.05), dec!(0.0499));
        store.update(&"BNBETH".into(), dec!(0.15), dec!(0.149));
        assert!(!store.has_all(&symbols));

        store.update(&"BNBBTC".into(), dec!(0.0076), dec!(0.0075));
        assert!(store.has_all(&symbols));
    }

    #[test]
    fn test_readers_see_whole_quotes_under_concurrent_writes() {
        let store = Arc::new(QuoteStore::new());
        let symbol: Arc<str> = "ETHBTC".into();
        store.update(&symbol, dec!(1), dec!(1));

        let writer = {
            let store = Arc::clone(&store);
            let symbol = Arc::clone(&symbol);
            std::thread::spawn(move || {
                for i in 1..=2000u32 {
                    let price = Decimal::from(i);
                    store.update(&symbol, price, price);
                }
            })
        };

        for _ in 0..2000 {
            let quote = store.get("ETHBTC").unwrap();
            assert_eq!(quote.ask, quote.bid);
        }

        writer.join().unwrap();
        assert_eq!(store.get("ETHBTC").unwrap().ask, dec!(2000));
    }
}
