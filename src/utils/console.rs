use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use colored::*;
use figlet_rs::FIGfont;
use tokio::sync::watch;
use tracing::{ info, warn };

use crate::arbitrage::engine::ArbitrageEngine;
use crate::config::Config;
use crate::models::arbitrage_result::{ LegPrice, TriangleStatus };
use crate::models::triangle::Triangle;

const SAMPLE_SIZE: usize = 10;
const EVALUATED_AT_FORMAT: &str = "%H:%M:%S%.3f";

pub fn print_config(config: &Config) {
    let json = serde_json::to_string_pretty(config).unwrap_or_default();

    info!("\n{}: \n{}", String::from("[CONFIG]").blue().underline(), json.magenta());
}

fn banner(text: &str) {
    match FIGfont::standard() {
        Ok(font) =>
            match font.convert(text) {
                Some(figure) => info!("\n{}", figure),
                None => info!("{}", text),
            }
        Err(e) => {
            warn!("Failed to load banner font: {}", e);
            info!("{}", text);
        }
    }
}

pub fn print_app_starting() {
    banner("TAD is starting...");
}

pub fn print_app_started() {
    banner("TAD is STARTED!!!");
}

/// Log a numbered sample of the discovered triangles
pub fn print_triangles(triangles: &[Arc<Triangle>]) {
    let sample = triangles
        .iter()
        .take(SAMPLE_SIZE)
        .enumerate()
        .map(|(i, t)| format!("{:3}. {}", i + 1, t))
        .collect::<Vec<_>>()
        .join("\n");

    info!("Sample triangles ({} of {}): \n{}", triangles.len().min(SAMPLE_SIZE), triangles.len(), sample);
}

fn format_legs(legs: &[LegPrice; 3]) -> String {
    legs.iter()
        .map(|leg| format!("{}: {}", leg.symbol, leg.price))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Table of every triangle with its legs, evaluation time (UTC) and arbitrage flag
pub fn render_results(snapshot: &[(Arc<str>, Arc<TriangleStatus>)]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} | {:<60} | {:<60} | {:<12} | {}",
        "Assets".bold(),
        "Ask Price".bold(),
        "Bid Price".bold(),
        "Evaluated At".bold(),
        "Triangular Arbitrage".bold()
    );

    for (code, status) in snapshot {
        let _ = match status.as_ref() {
            TriangleStatus::Pending => {
                writeln!(out, "{:<20} | {:<60} | {:<60} | {:<12} | {}", code, "-", "-", "-", "PENDING".dimmed())
            }
            TriangleStatus::Evaluated(result) => {
                let flag = if result.arbitrage_exists { "YES".green().bold() } else { "NO".red() };
                writeln!(
                    out,
                    "{:<20} | {:<60} | {:<60} | {:<12} | {}",
                    code,
                    format_legs(&result.ask_legs),
                    format_legs(&result.bid_legs),
                    result.evaluated_at.format(EVALUATED_AT_FORMAT).to_string(),
                    flag
                )
            }
        };
    }

    out
}

/// Highest quote sequence behind any published result
fn latest_sequence(snapshot: &[(Arc<str>, Arc<TriangleStatus>)]) -> u64 {
    snapshot
        .iter()
        .filter_map(|(_, status)| status.result().map(|r| r.sequence))
        .max()
        .unwrap_or(0)
}

/// Print the results table every `period` when it changed, until shutdown
pub async fn run_report_task(
    engine: Arc<ArbitrageEngine>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>
) {
    let results = engine.results();
    let mut interval = tokio::time::interval(period);
    let mut last_printed = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let snapshot = results.snapshot();
        let sequence = latest_sequence(&snapshot);
        if sequence == last_printed {
            continue;
        }
        last_printed = sequence;

        println!(
            "{} {}/{} triangles evaluated\n{}",
            chrono::Local::now().format("%H:%M:%S%.3f").to_string().cyan(),
            results.evaluated_count(),
            results.len(),
            render_results(&snapshot)
        );

        let opportunities = results.opportunities();
        for result in &opportunities {
            println!(
                "{} {} forward {:.6} backward {:.6} at {}",
                "OPPORTUNITY".green().bold(),
                result.triangle_code,
                result.forward_rate,
                result.backward_rate,
                result.evaluated_at.to_rfc3339()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{ TimeZone, Utc };
    use rust_decimal_macros::dec;

    use crate::models::arbitrage_result::ArbitrageResult;

    fn leg(symbol: &str, price: rust_decimal::Decimal) -> LegPrice {
        LegPrice { symbol: symbol.into(), price }
    }

    fn evaluated(exists: bool, sequence: u64) -> Arc<TriangleStatus> {
        Arc::new(
            TriangleStatus::Evaluated(ArbitrageResult {
                triangle_code: "BNB-ETH-BTC".into(),
                ask_legs: [leg("BNBETH", dec!(0.15)), leg("ETHBTC", dec!(0.05)), leg("BNBBTC", dec!(0.0076))],
                bid_legs: [
                    leg("BNBETH", dec!(0.149)),
                    leg("ETHBTC", dec!(0.0499)),
                    leg("BNBBTC", dec!(0.0075)),
                ],
                forward_rate: dec!(1),
                backward_rate: dec!(0.97),
                arbitrage_exists: exists,
                sequence,
                evaluated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap(),
            })
        )
    }

    #[test]
    fn test_render_rows() {
        let snapshot: Vec<(Arc<str>, Arc<TriangleStatus>)> = vec![
            (Arc::from("BNB-ETH-BTC"), evaluated(false, 3)),
            (Arc::from("ETH-BTC-USDT"), Arc::new(TriangleStatus::Pending))
        ];

        let table = render_results(&snapshot);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("BNB-ETH-BTC"));
        assert!(lines[1].contains("BNBETH: 0.15, ETHBTC: 0.05, BNBBTC: 0.0076"));
        assert!(lines[1].contains("BNBBTC: 0.0075"));
        assert!(lines[1].contains("12:30:15.000"));
        assert!(lines[1].contains("NO"));
        assert!(lines[2].starts_with("ETH-BTC-USDT"));
        assert!(lines[2].contains("PENDING"));
    }

    #[test]
    fn test_opportunity_flag() {
        let table = render_results(&[(Arc::<str>::from("BNB-ETH-BTC"), evaluated(true, 1))]);

        assert!(table.contains("YES"));
    }

    #[test]
    fn test_latest_sequence() {
        assert_eq!(latest_sequence(&[]), 0);

        let snapshot: Vec<(Arc<str>, Arc<TriangleStatus>)> = vec![
            (Arc::from("A-B-C"), evaluated(false, 4)),
            (Arc::from("B-C-D"), Arc::new(TriangleStatus::Pending)),
            (Arc::from("C-D-E"), evaluated(true, 9))
        ];
        assert_eq!(latest_sequence(&snapshot), 9);
    }
}
