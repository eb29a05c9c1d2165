//! Wire types for the Quill REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// API result code for a successful call.
pub const CODE_OK: i64 = 200;

/// Transaction types accepted by the sendTx endpoint.
pub const TX_TYPE_CREATE_ORDER: u8 = 2;
pub const TX_TYPE_CANCEL_ORDER: u8 = 3;

/// Limit order, good till time.
pub const ORDER_TYPE_LIMIT: u8 = 0;
pub const TIME_IN_FORCE_GOOD_TILL_TIME: u8 = 1;

/// Default order expiry, 28 days.
pub const DEFAULT_ORDER_EXPIRY_SECS: i64 = 28 * 24 * 60 * 60;

/// Static market registry: Quill addresses markets by index, not symbol.
#[derive(Debug, Clone, Copy)]
pub struct Market {
    pub symbol: &'static str,
    pub market_index: u32,
    /// Quantity precision, as a lot size (e.g. 0.0001 BTC).
    pub size_decimals: u32,
}

const MARKETS: &[Market] = &[
    Market {
        symbol: "BTC",
        market_index: 1,
        size_decimals: 5,
    },
    Market {
        symbol: "ETH",
        market_index: 2,
        size_decimals: 4,
    },
    Market {
        symbol: "SOL",
        market_index: 3,
        size_decimals: 2,
    },
];

/// Look up a market by symbol.
pub fn market_for(symbol: &str) -> Option<&'static Market> {
    MARKETS.iter().find(|m| m.symbol == symbol)
}

/// One resting order on the book.
#[derive(Debug, Clone, Deserialize)]
pub struct BookOrder {
    pub order_index: u64,
    pub owner_account_index: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub initial_base_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub remaining_base_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub order_expiry: i64,
}

/// Order book snapshot for one market.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookOrdersResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub total_asks: u32,
    pub asks: Vec<BookOrder>,
    pub total_bids: u32,
    pub bids: Vec<BookOrder>,
}

/// Next account nonce.
#[derive(Debug, Clone, Deserialize)]
pub struct NextNonceResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub nonce: u64,
}

/// Result of submitting a signed transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct SendTxResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Order as reported by the account-orders endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOrder {
    pub client_order_index: u64,
    pub market_index: u32,
    pub status: String,
    pub is_ask: bool,
    #[serde(with = "rust_decimal::serde::str")]
    pub filled_base_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub filled_quote_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub remaining_base_amount: Decimal,
}

/// Account orders, active or inactive.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountOrdersResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub orders: Vec<ApiOrder>,
}

/// Signed create-order transaction payload.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderTx {
    pub market_index: u32,
    pub client_order_index: u64,
    pub base_amount: String,
    pub price: String,
    pub is_ask: u8,
    pub order_type: u8,
    pub time_in_force: u8,
    pub reduce_only: u8,
    pub trigger_price: String,
    pub order_expiry: i64,
    pub nonce: u64,
    pub sig: String,
}

/// Signed cancel-order transaction payload.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderTx {
    pub market_index: u32,
    pub order_index: u64,
    pub nonce: u64,
    pub sig: String,
}

/// sendTx request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SendTxRequest<T: Serialize> {
    pub tx_type: u8,
    pub tx_info: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_protection: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_registry_lookup() {
        assert_eq!(market_for("BTC").unwrap().market_index, 1);
        assert!(market_for("DOGE").is_none());
    }

    #[test]
    fn book_order_parses_decimal_strings() {
        let raw = r#"{
            "order_index": 12,
            "owner_account_index": 7,
            "initial_base_amount": "1.5",
            "remaining_base_amount": "0.75",
            "price": "112735.5",
            "order_expiry": 1760000000
        }"#;
        let order: BookOrder = serde_json::from_str(raw).unwrap();
        assert_eq!(order.price.to_string(), "112735.5");
        assert_eq!(order.remaining_base_amount.to_string(), "0.75");
    }

    #[test]
    fn malformed_book_order_is_rejected() {
        // Numeric price where a decimal string is required.
        let raw = r#"{
            "order_index": 12,
            "owner_account_index": 7,
            "initial_base_amount": "1.5",
            "remaining_base_amount": "0.75",
            "price": 112735.5,
            "order_expiry": 1760000000
        }"#;
        assert!(serde_json::from_str::<BookOrder>(raw).is_err());
    }
}
