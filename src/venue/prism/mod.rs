//! Prism aggregator venue adapter.

mod client;
mod types;

pub use client::PrismClient;
pub use types::{token_for, Token};
