use anyhow::{ bail, Context, Result };
use dotenv::dotenv;
use serde::{ Deserialize, Serialize };
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::utils::serde_helpers::{ deserialize_level, parse_level, serialize_level };

const ENV_PREFIX: &str = "TAD_";
const DEFAULT_TARGET_ASSETS: &str = "BTC,USDT,ETH,BNB,XRP,ADA,SOL,DOT,DOGE,LTC,LINK";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub debug: bool,
    pub testnet: bool,

    /// Only pairs touching one of these assets enter the triangle search
    pub target_assets: Vec<String>,
    /// Cap on the filtered pair list
    pub max_pairs: usize,

    pub reconnect_delay_secs: u64,
    pub report_interval_ms: u64,
    pub stats_interval_secs: u64,

    #[serde(serialize_with = "serialize_level", deserialize_with = "deserialize_level")]
    pub log_level: Level,
    pub log_config: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub directory: PathBuf,
    pub filename_prefix: String,
    pub rotation: LogRotation,
    pub max_files: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine, the process environment may carry everything
        let dotenv_path = dotenv().ok();

        let config = Self::from_lookup(|key| env::var(key).ok())?;

        if config.debug {
            match dotenv_path {
                Some(path) => println!("Loaded .env file from: {}", path.display()),
                None => println!("No .env file loaded, using process environment"),
            }
        }

        Ok(config)
    }

    /// Build the config from `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self> where F: Fn(&str) -> Option<String> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        let debug = parse_or(&var, "DEBUG", false)?;
        let testnet = parse_or(&var, "TESTNET", false)?;

        let target_assets: Vec<String> = var("TARGET_ASSETS")
            .unwrap_or_else(|| DEFAULT_TARGET_ASSETS.to_string())
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if target_assets.is_empty() {
            bail!("{}TARGET_ASSETS must name at least one asset", ENV_PREFIX);
        }

        let max_pairs: usize = parse_or(&var, "MAX_PAIRS", 400)?;
        if max_pairs == 0 {
            bail!("{}MAX_PAIRS must be greater than zero", ENV_PREFIX);
        }

        let reconnect_delay_secs = parse_or(&var, "RECONNECT_DELAY_SECS", 5)?;
        let report_interval_ms: u64 = parse_or(&var, "REPORT_INTERVAL_MS", 1000)?;
        let stats_interval_secs: u64 = parse_or(&var, "STATS_INTERVAL_SECS", 60)?;
        if report_interval_ms == 0 || stats_interval_secs == 0 {
            bail!("Report and stats intervals must be greater than zero");
        }

        let log_level = match var("LOG_LEVEL") {
            Some(raw) =>
                parse_level(&raw).with_context(||
                    format!("Unknown log level in {}LOG_LEVEL: {}", ENV_PREFIX, raw)
                )?,
            None => Level::INFO,
        };

        let rotation = match var("LOG_ROTATION").map(|s| s.to_lowercase()).as_deref() {
            Some("hourly") => LogRotation::Hourly,
            Some("never") => LogRotation::Never,
            _ => LogRotation::Daily,
        };

        let max_files = match var("LOG_MAX_FILES") {
            Some(raw) =>
                Some(
                    raw
                        .parse::<usize>()
                        .with_context(|| format!("Failed to parse {}LOG_MAX_FILES", ENV_PREFIX))?
                ),
            None => None,
        };

        let log_config = LogConfig {
            directory: PathBuf::from(var("LOG_DIRECTORY").unwrap_or_else(|| "logs".to_string())),
            filename_prefix: var("LOG_FILENAME_PREFIX").unwrap_or_else(||
                "triangular_arbitrage".to_string()
            ),
            rotation,
            max_files,
        };

        Ok(Config {
            debug,
            testnet,
            target_assets,
            max_pairs,
            reconnect_delay_secs,
            report_interval_ms,
            stats_interval_secs,
            log_level,
            log_config,
        })
    }

    #[inline]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    #[inline]
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    #[inline]
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

fn parse_or<T, F>(var: &F, name: &str, default: T) -> Result<T>
    where T: FromStr, T::Err: std::error::Error + Send + Sync + 'static, F: Fn(&str) -> Option<String>
{
    match var(name) {
        Some(raw) =>
            raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("Failed to parse {}{} environment variable", ENV_PREFIX, name)),
        None => Ok(default),
    }
}
