//! # Spread Harvester
//!
//! Opportunistic cross-venue trading between an order-book perp DEX and a
//! DEX aggregator/router.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `error`: Failure taxonomy for the execution pipeline
//! - `venue`: Venue adapters (Quill order book, Prism aggregator, mock)
//! - `pricing`: Depth-walk liquidity pricing
//! - `strategy`: Opportunity scanning, order execution, ledger, cycle driver
//! - `persistence`: JSON snapshot store for ledger state
//! - `utils`: Bounded retries and decimal arithmetic

pub mod config;
pub mod error;
pub mod persistence;
pub mod pricing;
pub mod strategy;
pub mod utils;
pub mod venue;

pub use config::Config;
