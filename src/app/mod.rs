pub mod discover_mode;
pub mod normal_mode;

use std::time::Duration;

use anyhow::{ anyhow, Context, Result };
use tokio::runtime::Runtime;
use tracing::{ error, info, warn };

use crate::arbitrage::engine::ArbitrageEngine;
use crate::arbitrage::finder::TriangleFinder;
use crate::config::Config;
use crate::exchange::binance::BinanceClient;
use crate::exchange::client::ExchangeClient;

pub const API_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder
        ::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")
}

/// Fetch the catalog and search its triangles, shared by both modes
pub(crate) fn discover_engine(rt: &Runtime, config: &Config) -> Result<ArbitrageEngine> {
    let client = BinanceClient::new(config.testnet).context("Failed to create Binance client")?;

    let is_operational = rt.block_on(async {
        tokio::time::timeout(API_TIMEOUT, client.is_operational()).await
    });
    match is_operational {
        Ok(true) => info!("Exchange is operational: {}", client.name()),
        _ => warn!("{} did not answer ping, trying the catalog anyway", client.name()),
    }

    let finder = TriangleFinder::new(&config.target_assets, config.max_pairs);

    let engine = rt
        .block_on(async {
            tokio::time::timeout(API_TIMEOUT, ArbitrageEngine::discover(&client, &finder)).await
        })
        .map_err(|_| {
            error!("Timed out while fetching the catalog");
            anyhow!("Timed out after {:?} while fetching the catalog", API_TIMEOUT)
        })?
        .context("Failed to fetch the pair catalog")?;

    info!(
        "Tracking {} triangles over {} symbols",
        engine.triangles().len(),
        engine.subscription_symbols().len()
    );

    Ok(engine)
}
