// src/arbitrage/evaluator.rs

use chrono::Utc;
use rust_decimal::Decimal;

use crate::enums::side::Side;
use crate::error::EvaluationError;
use crate::models::arbitrage_result::{ ArbitrageResult, LegPrice };
use crate::models::quote::Quote;
use crate::models::triangle::{ ClosingLeg, Triangle };
use crate::quotes::store::QuoteStore;

/// Evaluate a triangle against the store's current quotes.
///
/// The dispatcher only calls this once all three legs are quoted, a missing
/// quote is reported as [`EvaluationError::MissingQuote`].
pub fn evaluate(triangle: &Triangle, quotes: &QuoteStore) -> Result<ArbitrageResult, EvaluationError> {
    let [ab, bc, closing] = triangle.symbols();

    let fetch = |symbol: &str| {
        quotes.get(symbol).ok_or_else(|| EvaluationError::MissingQuote(symbol.to_string()))
    };

    let ab_quote = fetch(ab)?;
    let bc_quote = fetch(bc)?;
    let closing_quote = fetch(closing)?;

    evaluate_quotes(triangle, [&ab_quote, &bc_quote, &closing_quote])
}

/// Pure evaluation over quotes given in leg order (AB, BC, closing).
///
/// With a direct closing leg A/C:
///   forward  = ask(AB) * ask(BC) / bid(AC)
///   backward = bid(AB) * bid(BC) / ask(AC)
/// With an inverted closing leg C/A:
///   forward  = ask(AB) * ask(BC) * ask(CA)
///   backward = bid(AB) * bid(BC) * bid(CA)
///
/// An opportunity exists when forward < 1 or backward > 1. A direct leg is
/// decided by cross-multiplying against the closing price, so division never
/// enters the decision. An inverted leg compares the three-leg product with 1.
/// `Decimal` rounds products past 28 significant digits, but prices with at
/// most 8 decimals put any product that is not exactly 1 at least 1e-24 away
/// from it, far outside that rounding. The divided rates are only reported.
pub fn evaluate_quotes(
    triangle: &Triangle,
    quotes: [&Quote; 3]
) -> Result<ArbitrageResult, EvaluationError> {
    let legs = triangle.legs();

    for (leg, quote) in legs.iter().zip(quotes) {
        for side in Side::ALL {
            let price = quote.price(side);
            if price <= Decimal::ZERO {
                return Err(EvaluationError::InvalidQuote {
                    symbol: leg.symbol.to_string(),
                    side,
                    price,
                });
            }
        }
    }

    let [ab, bc, closing] = quotes;
    let overflow = || EvaluationError::Arithmetic(triangle.code().to_string());

    let asks = ab.ask.checked_mul(bc.ask).ok_or_else(overflow)?;
    let bids = ab.bid.checked_mul(bc.bid).ok_or_else(overflow)?;

    let (forward_rate, backward_rate, forward_open, backward_open) = match triangle.orientation() {
        ClosingLeg::Direct => {
            let forward = asks.checked_div(closing.bid).ok_or_else(overflow)?;
            let backward = bids.checked_div(closing.ask).ok_or_else(overflow)?;
            (forward, backward, asks < closing.bid, bids > closing.ask)
        }
        ClosingLeg::Inverted => {
            let forward = asks.checked_mul(closing.ask).ok_or_else(overflow)?;
            let backward = bids.checked_mul(closing.bid).ok_or_else(overflow)?;
            (forward, backward, forward < Decimal::ONE, backward > Decimal::ONE)
        }
    };

    let leg_prices = |side: Side| {
        let [first, second, third] = legs;
        [
            LegPrice { symbol: first.symbol.clone(), price: ab.price(side) },
            LegPrice { symbol: second.symbol.clone(), price: bc.price(side) },
            LegPrice { symbol: third.symbol.clone(), price: closing.price(side) },
        ]
    };

    Ok(ArbitrageResult {
        triangle_code: triangle.code().clone(),
        ask_legs: leg_prices(Side::Ask),
        bid_legs: leg_prices(Side::Bid),
        forward_rate,
        backward_rate,
        arbitrage_exists: forward_open || backward_open,
        sequence: ab.sequence.max(bc.sequence).max(closing.sequence),
        evaluated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use rust_decimal_macros::dec;

    use crate::models::trading_pair::TradingPair;

    fn pair(symbol: &str, base: &str, quote: &str) -> Arc<TradingPair> {
        Arc::new(TradingPair::new(symbol, base, quote).unwrap())
    }

    /// BNB-ETH-BTC: AB = BNBETH, BC = ETHBTC, closing AC = BNBBTC
    fn direct_triangle() -> Triangle {
        Triangle::from_legs([
            pair("ETHBTC", "ETH", "BTC"),
            pair("BNBETH", "BNB", "ETH"),
            pair("BNBBTC", "BNB", "BTC"),
        ]).unwrap()
    }

    /// AAA-BBB-CCC closed by CCC/AAA
    fn inverted_triangle() -> Triangle {
        Triangle::from_legs([
            pair("AAABBB", "AAA", "BBB"),
            pair("BBBCCC", "BBB", "CCC"),
            pair("CCCAAA", "CCC", "AAA"),
        ]).unwrap()
    }

    fn store_with(quotes: &[(&str, Decimal, Decimal)]) -> QuoteStore {
        let store = QuoteStore::new();
        for (symbol, ask, bid) in quotes {
            store.update(&Arc::from(*symbol), *ask, *bid);
        }
        store
    }

    fn scenario_store() -> QuoteStore {
        store_with(
            &[
                ("ETHBTC", dec!(0.05), dec!(0.0499)),
                ("BNBETH", dec!(0.15), dec!(0.149)),
                ("BNBBTC", dec!(0.0076), dec!(0.0075)),
            ]
        )
    }

    #[test]
    fn test_scenario_rates_are_exact() {
        let triangle = direct_triangle();
        let store = scenario_store();

        let result = evaluate(&triangle, &store).unwrap();

        // 0.15 * 0.05 / 0.0075 is exactly 1, not a profitable forward loop
        assert_eq!(result.forward_rate, dec!(1));
        assert_eq!(result.backward_rate, (dec!(0.149) * dec!(0.0499)) / dec!(0.0076));
        assert!(result.backward_rate < dec!(1));
        assert_eq!(
            result.arbitrage_exists,
            result.forward_rate < dec!(1) || result.backward_rate > dec!(1)
        );
        assert!(!result.arbitrage_exists);

        assert_eq!(result.triangle_code.as_ref(), "BNB-ETH-BTC");
        assert_eq!(result.ask_legs[0].symbol.as_ref(), "BNBETH");
        assert_eq!(result.ask_legs[0].price, dec!(0.15));
        assert_eq!(result.bid_legs[2].symbol.as_ref(), "BNBBTC");
        assert_eq!(result.bid_legs[2].price, dec!(0.0075));
        assert_eq!(result.sequence, store.last_sequence());
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let triangle = direct_triangle();
        let store = scenario_store();

        let first = evaluate(&triangle, &store).unwrap();
        let second = evaluate(&triangle, &store).unwrap();

        assert!(second.evaluated_at >= first.evaluated_at);
        assert_eq!(ArbitrageResult { evaluated_at: first.evaluated_at, ..second }, first);
    }

    #[test]
    fn test_result_is_timestamped() {
        let triangle = direct_triangle();
        let store = scenario_store();

        let before = Utc::now();
        let result = evaluate(&triangle, &store).unwrap();
        let after = Utc::now();

        assert!(result.evaluated_at >= before);
        assert!(result.evaluated_at <= after);
    }

    #[test]
    fn test_forward_opportunity() {
        let triangle = direct_triangle();
        let store = store_with(
            &[
                ("BNBETH", dec!(0.1), dec!(0.09)),
                ("ETHBTC", dec!(0.05), dec!(0.049)),
                ("BNBBTC", dec!(0.0061), dec!(0.006)),
            ]
        );

        let result = evaluate(&triangle, &store).unwrap();

        assert!(result.forward_rate < dec!(1));
        assert!(result.arbitrage_exists);
    }

    #[test]
    fn test_backward_opportunity() {
        let triangle = direct_triangle();
        let store = store_with(
            &[
                ("BNBETH", dec!(0.151), dec!(0.15)),
                ("ETHBTC", dec!(0.051), dec!(0.05)),
                ("BNBBTC", dec!(0.007), dec!(0.0069)),
            ]
        );

        let result = evaluate(&triangle, &store).unwrap();

        assert!(result.forward_rate > dec!(1));
        assert!(result.backward_rate > dec!(1));
        assert!(result.arbitrage_exists);
    }

    #[test]
    fn test_inverted_closing_leg() {
        let triangle = inverted_triangle();
        let store = store_with(
            &[
                ("AAABBB", dec!(2), dec!(1.9)),
                ("BBBCCC", dec!(3), dec!(2.9)),
                ("CCCAAA", dec!(0.16), dec!(0.15)),
            ]
        );

        let result = evaluate(&triangle, &store).unwrap();

        assert_eq!(result.forward_rate, dec!(0.96));
        assert_eq!(result.backward_rate, dec!(0.8265));
        assert!(result.arbitrage_exists);

        let balanced = store_with(
            &[
                ("AAABBB", dec!(2), dec!(1.9)),
                ("BBBCCC", dec!(3), dec!(2.9)),
                ("CCCAAA", dec!(0.2), dec!(0.18)),
            ]
        );
        let result = evaluate(&triangle, &balanced).unwrap();
        assert_eq!(result.forward_rate, dec!(1.2));
        assert!(!result.arbitrage_exists);
    }

    #[test]
    fn test_inverted_decision_near_one() {
        let triangle = inverted_triangle();
        let store = store_with(
            &[
                ("AAABBB", dec!(1.00000001), dec!(0.5)),
                ("BBBCCC", dec!(1.00000001), dec!(0.5)),
                ("CCCAAA", dec!(0.99999998), dec!(0.5)),
            ]
        );

        let result = evaluate(&triangle, &store).unwrap();

        // 1 - 3e-16 - 2e-24, every digit kept
        assert_eq!(result.forward_rate, dec!(0.999999999999999699999998));
        assert!(result.arbitrage_exists);

        let exact = store_with(
            &[
                ("AAABBB", dec!(1.25), dec!(0.5)),
                ("BBBCCC", dec!(0.8), dec!(0.5)),
                ("CCCAAA", dec!(1.00000000), dec!(0.5)),
            ]
        );
        let result = evaluate(&triangle, &exact).unwrap();
        assert_eq!(result.forward_rate, dec!(1));
        assert!(!result.arbitrage_exists);
    }

    #[test]
    fn test_zero_closing_ask_is_rejected() {
        let triangle = direct_triangle();
        let store = store_with(
            &[
                ("BNBETH", dec!(0.15), dec!(0.149)),
                ("ETHBTC", dec!(0.05), dec!(0.0499)),
                ("BNBBTC", Decimal::ZERO, dec!(0.0075)),
            ]
        );

        let err = evaluate(&triangle, &store).unwrap_err();

        assert_eq!(err, EvaluationError::InvalidQuote {
            symbol: "BNBBTC".to_string(),
            side: Side::Ask,
            price: Decimal::ZERO,
        });
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let triangle = direct_triangle();
        let store = store_with(
            &[
                ("BNBETH", dec!(0.15), dec!(-0.149)),
                ("ETHBTC", dec!(0.05), dec!(0.0499)),
                ("BNBBTC", dec!(0.0076), dec!(0.0075)),
            ]
        );

        assert!(matches!(
            evaluate(&triangle, &store),
            Err(EvaluationError::InvalidQuote { side: Side::Bid, .. })
        ));
    }

    #[test]
    fn test_missing_quote_is_reported() {
        let triangle = direct_triangle();
        let store = store_with(&[("BNBETH", dec!(0.15), dec!(0.149))]);

        assert_eq!(
            evaluate(&triangle, &store),
            Err(EvaluationError::MissingQuote("ETHBTC".to_string()))
        );
    }
}
