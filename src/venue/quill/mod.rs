//! Quill order-book venue adapter.

mod client;
mod types;

pub use client::QuillClient;
pub use types::{market_for, Market};
