use std::fmt;
use std::sync::Arc;

use crate::error::TriangleCodeError;
use super::trading_pair::{ Asset, TradingPair, CODE_SEPARATOR };

/// How the third pair of a triangle joins the first and last asset of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClosingLeg {
    /// Listed as A/C, traded against the direction of the cycle
    Direct,
    /// Listed as C/A, its quote asset closes the loop back to A
    Inverted,
}

/// Three trading pairs forming the canonical cycle A → B → C → A.
///
/// The legs are `ab` (A/B), `bc` (B/C) and a closing leg joining A and C
/// whose listing direction is recorded in [`ClosingLeg`]. Ordering is fixed at
/// construction and never re-derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triangle {
    code: Arc<str>,
    assets: [Asset; 3],
    ab: Arc<TradingPair>,
    bc: Arc<TradingPair>,
    closing: Arc<TradingPair>,
    orientation: ClosingLeg,
}

impl Triangle {
    /// Chain three pairs into their canonical cycle.
    ///
    /// Every ordered choice of two legs where the first one's quote is the
    /// second one's base is a candidate A → B → C; the remaining leg must join
    /// A and C. When several rotations qualify the smallest `(A, B, C)` wins,
    /// so the result does not depend on the order of `legs`.
    /// Returns `None` when no chain closes the loop.
    pub fn from_legs(legs: [Arc<TradingPair>; 3]) -> Option<Self> {
        let mut best: Option<Self> = None;

        for (i, first) in legs.iter().enumerate() {
            for (j, second) in legs.iter().enumerate() {
                if i == j || first.quote_asset != second.base_asset {
                    continue;
                }

                let a = &first.base_asset;
                let c = &second.quote_asset;
                if a == c {
                    continue;
                }

                let Some(k) = (0..legs.len()).find(|k| *k != i && *k != j) else {
                    continue;
                };
                let closing = &legs[k];

                let orientation = if closing.base_asset == *a && closing.quote_asset == *c {
                    ClosingLeg::Direct
                } else if closing.base_asset == *c && closing.quote_asset == *a {
                    ClosingLeg::Inverted
                } else {
                    continue;
                };

                let assets = [a.clone(), first.quote_asset.clone(), c.clone()];
                let is_better = best.as_ref().map_or(true, |current| assets < current.assets);

                if is_better {
                    best = Some(Self {
                        code: format_code(&assets).into(),
                        assets,
                        ab: Arc::clone(first),
                        bc: Arc::clone(second),
                        closing: Arc::clone(closing),
                        orientation,
                    });
                }
            }
        }

        best
    }

    /// Display code "A-B-C"
    #[inline]
    pub fn code(&self) -> &Arc<str> {
        &self.code
    }

    #[inline]
    pub fn assets(&self) -> &[Asset; 3] {
        &self.assets
    }

    /// Legs in evaluation order: AB, BC, closing
    #[inline]
    pub fn legs(&self) -> [&Arc<TradingPair>; 3] {
        [&self.ab, &self.bc, &self.closing]
    }

    #[inline]
    pub fn symbols(&self) -> [&str; 3] {
        [self.ab.symbol.as_ref(), self.bc.symbol.as_ref(), self.closing.symbol.as_ref()]
    }

    #[inline]
    pub fn orientation(&self) -> ClosingLeg {
        self.orientation
    }

    #[inline]
    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.symbols().contains(&symbol)
    }
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} → {} → {}]",
            self.code,
            self.ab.symbol,
            self.bc.symbol,
            self.closing.symbol
        )
    }
}

/// Join three assets into a triangle code
pub fn format_code(assets: &[Asset; 3]) -> String {
    let mut code = String::with_capacity(assets.iter().map(|a| a.len() + 1).sum());
    for (i, asset) in assets.iter().enumerate() {
        if i > 0 {
            code.push(CODE_SEPARATOR);
        }
        code.push_str(asset);
    }
    code
}

/// Recover the ordered asset triple from a triangle code
pub fn parse_code(code: &str) -> Result<[Asset; 3], TriangleCodeError> {
    let parts: Vec<&str> = code.split(CODE_SEPARATOR).collect();

    let [a, b, c] = parts.as_slice() else {
        return Err(TriangleCodeError::WrongArity(code.to_string()));
    };

    if a.is_empty() || b.is_empty() || c.is_empty() {
        return Err(TriangleCodeError::EmptyAsset(code.to_string()));
    }
    if a == b || b == c || a == c {
        return Err(TriangleCodeError::RepeatedAsset(code.to_string()));
    }

    Ok([(*a).into(), (*b).into(), (*c).into()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(symbol: &str, base: &str, quote: &str) -> Arc<TradingPair> {
        Arc::new(TradingPair::new(symbol, base, quote).unwrap())
    }

    #[test]
    fn test_transitive_legs_close_with_direct_leg() {
        let ethbtc = pair("ETHBTC", "ETH", "BTC");
        let bnbeth = pair("BNBETH", "BNB", "ETH");
        let bnbbtc = pair("BNBBTC", "BNB", "BTC");

        let triangle = Triangle::from_legs([ethbtc, bnbeth, bnbbtc]).unwrap();

        assert_eq!(triangle.code().as_ref(), "BNB-ETH-BTC");
        assert_eq!(triangle.symbols(), ["BNBETH", "ETHBTC", "BNBBTC"]);
        assert_eq!(triangle.orientation(), ClosingLeg::Direct);
        assert!(triangle.contains_symbol("ETHBTC"));
        assert!(!triangle.contains_symbol("BTCUSDT"));
    }

    #[test]
    fn test_cyclic_legs_pick_smallest_rotation() {
        let ab = pair("AAABBB", "AAA", "BBB");
        let bc = pair("BBBCCC", "BBB", "CCC");
        let ca = pair("CCCAAA", "CCC", "AAA");

        let orders = [
            [ab.clone(), bc.clone(), ca.clone()],
            [ca.clone(), ab.clone(), bc.clone()],
            [bc.clone(), ca.clone(), ab.clone()],
            [ca.clone(), bc.clone(), ab.clone()],
        ];

        for legs in orders {
            let triangle = Triangle::from_legs(legs).unwrap();
            assert_eq!(triangle.code().as_ref(), "AAA-BBB-CCC");
            assert_eq!(triangle.symbols(), ["AAABBB", "BBBCCC", "CCCAAA"]);
            assert_eq!(triangle.orientation(), ClosingLeg::Inverted);
        }
    }

    #[test]
    fn test_legs_without_a_chain_are_rejected() {
        // Two listings of ETH/BTC: three assets, no mirror, but nothing closes the loop
        let legs = [
            pair("ETHBTC", "ETH", "BTC"),
            pair("ETHBTC2", "ETH", "BTC"),
            pair("BNBETH", "BNB", "ETH"),
        ];
        assert!(Triangle::from_legs(legs).is_none());

        // Every pair quoted in BTC, BTC is never a base
        let legs = [
            pair("ETHBTC", "ETH", "BTC"),
            pair("BNBBTC", "BNB", "BTC"),
            pair("XRPBTC", "XRP", "BTC"),
        ];
        assert!(Triangle::from_legs(legs).is_none());
    }

    #[test]
    fn test_code_round_trip() {
        let triangle = Triangle::from_legs([
            pair("ETHBTC", "ETH", "BTC"),
            pair("BNBETH", "BNB", "ETH"),
            pair("BNBBTC", "BNB", "BTC"),
        ]).unwrap();

        let parsed = parse_code(triangle.code()).unwrap();
        assert_eq!(&parsed, triangle.assets());
        assert_eq!(format_code(&parsed), triangle.code().as_ref());
    }

    #[test]
    fn test_parse_code_rejects_bad_codes() {
        assert!(matches!(parse_code("A-B"), Err(TriangleCodeError::WrongArity(_))));
        assert!(matches!(parse_code("A-B-C-D"), Err(TriangleCodeError::WrongArity(_))));
        assert!(matches!(parse_code("A--C"), Err(TriangleCodeError::EmptyAsset(_))));
        assert!(matches!(parse_code("A-B-A"), Err(TriangleCodeError::RepeatedAsset(_))));
    }
}
