//! Configuration management for the spread harvester.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Order-book venue credentials and endpoints
    #[serde(default)]
    pub quill: QuillConfig,
    /// Aggregator venue endpoints
    #[serde(default)]
    pub prism: PrismConfig,
    /// What to trade and when
    #[serde(default)]
    pub trade: TradeConfig,
    /// Retry budgets for the execution coordinator
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Snapshot persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuillConfig {
    /// REST base URL
    #[serde(default)]
    pub base_url: String,
    /// API key for authenticated endpoints
    #[serde(default)]
    pub api_key: String,
    /// Secret key for request signing
    #[serde(default)]
    pub secret_key: String,
    /// Account index on the venue
    #[serde(default)]
    pub account_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrismConfig {
    /// Quote API endpoint
    #[serde(default)]
    pub quote_url: String,
    /// Execution relay endpoint (owns transaction signing)
    #[serde(default)]
    pub relay_url: String,
    /// Chain id passed through to the quote API
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Slippage tolerance in basis points
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
    /// Quote deadline in seconds
    #[serde(default = "default_quote_deadline_secs")]
    pub quote_deadline_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// Instruments to scan
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Target notional values (quote currency) to price each cycle
    #[serde(default = "default_input_values")]
    pub input_values: Vec<Decimal>,
    /// Rough reference prices used to size sell-side quotes
    #[serde(default = "default_rough_prices")]
    pub rough_prices: HashMap<String, Decimal>,
    /// Minimum round-trip profit (quote currency) to act on
    #[serde(default = "default_min_edge")]
    pub min_edge: Decimal,
    /// Seconds between strategy cycles
    #[serde(default = "default_cycle_secs")]
    pub cycle_secs: u64,
    /// Dump per-cycle market data to JSON files for offline inspection
    #[serde(default)]
    pub debug_dump: bool,
    /// Directory for debug dumps
    #[serde(default = "default_dump_dir")]
    pub dump_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Order creation attempts (no backoff between them)
    #[serde(default = "default_create_attempts")]
    pub create_attempts: u32,
    /// Poll attempts per phase
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    /// Delay between failed poll attempts, in milliseconds
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot file, one per strategy instance
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

// Default value functions

fn default_chain_id() -> u64 {
    146
}

fn default_slippage_bps() -> u32 {
    20
}

fn default_quote_deadline_secs() -> u64 {
    10800
}

fn default_symbols() -> Vec<String> {
    vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()]
}

fn default_input_values() -> Vec<Decimal> {
    vec![Decimal::new(10, 0), Decimal::new(100, 0)]
}

fn default_rough_prices() -> HashMap<String, Decimal> {
    HashMap::from([
        ("USDC".to_string(), Decimal::ONE),
        ("BTC".to_string(), Decimal::new(110_000, 0)),
        ("ETH".to_string(), Decimal::new(4_500, 0)),
        ("SOL".to_string(), Decimal::new(180, 0)),
    ])
}

fn default_min_edge() -> Decimal {
    Decimal::new(5, 1) // 0.5 quote units
}

fn default_cycle_secs() -> u64 {
    60
}

fn default_dump_dir() -> String {
    "data".to_string()
}

fn default_create_attempts() -> u32 {
    3
}

fn default_poll_attempts() -> u32 {
    3
}

fn default_poll_delay_ms() -> u64 {
    1000
}

fn default_data_file() -> String {
    "data/harvester-state.json".to_string()
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("SH"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.trade.symbols.is_empty(), "trade.symbols must not be empty");

        anyhow::ensure!(
            !self.trade.input_values.is_empty(),
            "trade.input_values must not be empty"
        );

        for value in &self.trade.input_values {
            anyhow::ensure!(*value > Decimal::ZERO, "trade.input_values must be positive");
        }

        for symbol in &self.trade.symbols {
            anyhow::ensure!(
                self.trade
                    .rough_prices
                    .get(symbol)
                    .is_some_and(|p| *p > Decimal::ZERO),
                "trade.rough_prices missing a positive price for {symbol}"
            );
        }

        anyhow::ensure!(self.trade.min_edge >= Decimal::ZERO, "trade.min_edge must be >= 0");
        anyhow::ensure!(self.trade.cycle_secs >= 1, "trade.cycle_secs must be >= 1");

        anyhow::ensure!(
            self.execution.create_attempts >= 1 && self.execution.poll_attempts >= 1,
            "execution retry budgets must be >= 1"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quill: QuillConfig::default(),
            prism: PrismConfig::default(),
            trade: TradeConfig::default(),
            execution: ExecutionConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            secret_key: String::new(),
            account_index: 0,
        }
    }
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self {
            quote_url: String::new(),
            relay_url: String::new(),
            chain_id: default_chain_id(),
            slippage_bps: default_slippage_bps(),
            quote_deadline_secs: default_quote_deadline_secs(),
        }
    }
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            input_values: default_input_values(),
            rough_prices: default_rough_prices(),
            min_edge: default_min_edge(),
            cycle_secs: default_cycle_secs(),
            debug_dump: false,
            dump_dir: default_dump_dir(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            create_attempts: default_create_attempts(),
            poll_attempts: default_poll_attempts(),
            poll_delay_ms: default_poll_delay_ms(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_rough_price_is_rejected() {
        let mut config = Config::default();
        config.trade.symbols.push("DOGE".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_input_value_is_rejected() {
        let mut config = Config::default();
        config.trade.input_values = vec![dec!(10), Decimal::ZERO];
        assert!(config.validate().is_err());
    }
}
