//! Venue-facing data model shared by every adapter.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Venue-specific execution detail of an order request.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderDetail {
    /// Limit order against an order book.
    BookLimit {
        price: Decimal,
        base_amount: Decimal,
    },
    /// Pre-routed swap: calldata prepared by the aggregator's quote.
    RouterCall(RouterCall),
}

/// Prepared router invocation returned alongside an aggregator quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterCall {
    pub call_data: String,
    /// Native value to attach, in wei.
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
}

/// A single order to be placed on one venue.
///
/// Created by the opportunity scanner, consumed exactly once by the
/// execution coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: Side,
    /// Amount spent: quote currency for buys, base units for sells.
    pub amount_in: Decimal,
    pub detail: OrderDetail,
}

/// Venue-assigned correlation data needed to poll or cancel an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correlation {
    /// Order-book venues address orders by market and client index.
    Book {
        market_index: u32,
        client_order_index: u64,
        nonce: u64,
    },
    /// On-chain venues address orders by transaction hash.
    Chain { tx_hash: String },
}

/// Opaque identity of a created order. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub id: String,
    pub venue: String,
    pub instrument: String,
    pub correlation: Correlation,
}

/// Guaranteed-present payload of a filled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub instrument: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_out: Decimal,
}

/// Resolved (or still-resolving) state of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderOutcome {
    Pending,
    /// Resting maker order.
    Live,
    PartiallyFilled,
    Filled(Fill),
    Canceled,
}

impl OrderOutcome {
    /// Filled and Canceled are terminal; everything else is re-pollable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderOutcome::Filled(_) | OrderOutcome::Canceled)
    }

    /// The fill payload, present only for `Filled`.
    pub fn fill(&self) -> Option<&Fill> {
        match self {
            OrderOutcome::Filled(fill) => Some(fill),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderOutcome::Pending => write!(f, "pending"),
            OrderOutcome::Live => write!(f, "live"),
            OrderOutcome::PartiallyFilled => write!(f, "partially_filled"),
            OrderOutcome::Filled(_) => write!(f, "filled"),
            OrderOutcome::Canceled => write!(f, "canceled"),
        }
    }
}

/// Lifecycle status shared by positions and their venue-side parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Opened,
    Closed,
}

/// Venue-side record of one filled order leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalPosition {
    pub id: String,
    pub venue: String,
    pub status: PositionStatus,
    pub instrument: String,
}

/// What the scanner asks each venue for.
#[derive(Debug, Clone)]
pub struct MarketDataRequest {
    /// Instruments to quote, in the venue's symbol namespace.
    pub symbols: Vec<String>,
    /// Target notional values (quote currency) to price at.
    pub values: Vec<Decimal>,
    /// Rough reference prices used to size sell-side quotes.
    pub rough_prices: HashMap<String, Decimal>,
}

/// One venue's executable view of the market for a single cycle.
///
/// `is_available == false` is an expected, non-fatal condition; the quotes
/// table is empty in that case.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MarketData {
    pub is_available: bool,
    pub quotes: QuoteTable,
}

impl MarketData {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn available(quotes: QuoteTable) -> Self {
        Self {
            is_available: true,
            quotes,
        }
    }
}

/// Executable quote for one (instrument, target value, side) combination.
///
/// Derived every cycle, never persisted. The payload is only present when
/// the venue needs quote-time data to execute (router calldata).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityQuote {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_in: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_out: Decimal,
    pub side: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<RouterCall>,
}

/// Both directions priced for one target value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideQuotes {
    pub buy: LiquidityQuote,
    pub sell: LiquidityQuote,
}

/// symbol → target value → {buy, sell} quotes.
///
/// Every venue produces this same shape (depth-walk venues by consuming
/// book levels, single-quote venues by one aggregator request per entry),
/// so consumers never need to know which kind of venue priced it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuoteTable {
    entries: HashMap<String, HashMap<Decimal, SideQuotes>>,
}

impl QuoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, value: Decimal, quotes: SideQuotes) {
        self.entries
            .entry(symbol.to_string())
            .or_default()
            .insert(value, quotes);
    }

    pub fn get(&self, symbol: &str, value: Decimal) -> Option<&SideQuotes> {
        self.entries.get(symbol).and_then(|by_value| by_value.get(&value))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
