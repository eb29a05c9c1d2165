//! Wire types and token registry for the Prism aggregator.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Token metadata needed to build quote requests.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub symbol: &'static str,
    pub address: &'static str,
    pub decimals: u32,
}

const TOKENS: &[Token] = &[
    Token {
        symbol: "USDC",
        address: "0x29219dd400f2Bf60E5a23d13Be72B486D4038894",
        decimals: 6,
    },
    Token {
        symbol: "BTC",
        address: "0x0555E30da8f98308EdB960aa94C0Db47230d2B9c",
        decimals: 8,
    },
    Token {
        symbol: "ETH",
        address: "0x50c42dEAcD8Fc9773493ED674b675bE577f2634b",
        decimals: 18,
    },
    Token {
        symbol: "SOL",
        address: "0xd31183246a6f7a4c4c8cff134f69f98bbaec24ad",
        decimals: 9,
    },
];

/// Look up a token by symbol.
pub fn token_for(symbol: &str) -> Option<&'static Token> {
    TOKENS.iter().find(|t| t.symbol == symbol)
}

/// Router invocation parameters attached to a quote.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodParameters {
    pub calldata: String,
    /// Native value as a 0x-prefixed hex string.
    pub value: String,
}

/// Aggregator quote response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteApiResponse {
    /// Present when the aggregator could not route the swap.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Output amount in the out-token's smallest units.
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub method_parameters: Option<MethodParameters>,
}

/// Relay response to an execution request.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    pub tx_hash: String,
}

/// Relay view of a submitted transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayReceipt {
    /// "pending", "success" or "reverted".
    pub status: String,
    /// Decoded output amount in human units; present on success.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub amount_out: Option<Decimal>,
}
