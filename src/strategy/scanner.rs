//! Cross-venue opportunity scanning.
//!
//! Compares executable quotes between the aggregator (primary) and the
//! order-book venue for every (instrument, target value) combination, in
//! both directions, before any order is placed.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::config::TradeConfig;
use crate::strategy::types::{Leg, Opportunity, OpportunityKind};
use crate::utils::decimal::round_to_precision;
use crate::venue::{
    LiquidityQuote, MarketData, MarketDataRequest, OrderDetail, OrderRequest, QuoteTable, Side,
    SideQuotes, VenueAdapter,
};

/// Scans two venues for profitable round trips.
pub struct OpportunityScanner {
    /// The aggregator. Its availability gates the whole cycle.
    primary: Arc<dyn VenueAdapter>,
    /// The order-book venue.
    secondary: Arc<dyn VenueAdapter>,
    trade: TradeConfig,
}

impl OpportunityScanner {
    pub fn new(
        primary: Arc<dyn VenueAdapter>,
        secondary: Arc<dyn VenueAdapter>,
        trade: TradeConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            trade,
        }
    }

    fn market_request(&self) -> MarketDataRequest {
        MarketDataRequest {
            symbols: self.trade.symbols.clone(),
            values: self.trade.input_values.clone(),
            rough_prices: self.trade.rough_prices.clone(),
        }
    }

    /// Discover opportunities for this cycle, best edge first. An
    /// unavailable primary venue is an expected condition and yields an
    /// empty list, not an error.
    #[instrument(skip(self), name = "find_opportunities")]
    pub async fn find_opportunities(&self) -> Vec<Opportunity> {
        let request = self.market_request();
        let (primary_data, secondary_data) = tokio::join!(
            self.primary.get_market_data(&request),
            self.secondary.get_market_data(&request),
        );

        if self.trade.debug_dump {
            self.dump_market_data(self.primary.name(), &primary_data).await;
            self.dump_market_data(self.secondary.name(), &secondary_data).await;
        }

        if !primary_data.is_available {
            info!(venue = %self.primary.name(), "Primary market data unavailable, skipping cycle");
            return Vec::new();
        }
        if !secondary_data.is_available {
            info!(venue = %self.secondary.name(), "Secondary market data unavailable, nothing to compare");
            return Vec::new();
        }

        let mut ranked: Vec<(Decimal, Opportunity)> = Vec::new();
        for symbol in &self.trade.symbols {
            for &value in &self.trade.input_values {
                let (Some(primary_quotes), Some(secondary_quotes)) = (
                    primary_data.quotes.get(symbol, value),
                    secondary_data.quotes.get(symbol, value),
                ) else {
                    debug!(%symbol, %value, "Quote missing on one venue, skipping combination");
                    continue;
                };

                if let Some(entry) =
                    self.outbound_opportunity(symbol, value, primary_quotes, secondary_quotes)
                {
                    ranked.push(entry);
                }
                if let Some(entry) =
                    self.return_opportunity(symbol, value, primary_quotes, secondary_quotes)
                {
                    ranked.push(entry);
                }
            }
        }

        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        if !ranked.is_empty() {
            info!(count = ranked.len(), best_edge = %ranked[0].0, "Opportunities found");
        }
        ranked.into_iter().map(|(_, opp)| opp).collect()
    }

    /// Buy on the aggregator, sell into the book.
    fn outbound_opportunity(
        &self,
        symbol: &str,
        value: Decimal,
        primary: &SideQuotes,
        secondary: &SideQuotes,
    ) -> Option<(Decimal, Opportunity)> {
        let edge = secondary.sell.amount_out - value;
        if edge < self.trade.min_edge {
            return None;
        }
        let buy_leg = self.router_leg(self.primary.name(), symbol, &primary.buy)?;
        let sell_leg = self.book_leg(self.secondary.name(), symbol, &secondary.sell)?;

        Some((
            edge,
            Opportunity {
                description: format!(
                    "buy {symbol} on {} for {value}, sell on {} for {} (edge {edge})",
                    self.primary.name(),
                    self.secondary.name(),
                    secondary.sell.amount_out,
                ),
                kind: OpportunityKind::Open,
                legs: vec![buy_leg, sell_leg],
            },
        ))
    }

    /// Buy from the book, sell on the aggregator.
    fn return_opportunity(
        &self,
        symbol: &str,
        value: Decimal,
        primary: &SideQuotes,
        secondary: &SideQuotes,
    ) -> Option<(Decimal, Opportunity)> {
        let edge = primary.sell.amount_out - value;
        if edge < self.trade.min_edge {
            return None;
        }
        let buy_leg = self.book_leg(self.secondary.name(), symbol, &secondary.buy)?;
        let sell_leg = self.router_leg(self.primary.name(), symbol, &primary.sell)?;

        Some((
            edge,
            Opportunity {
                description: format!(
                    "buy {symbol} on {} for {value}, sell on {} for {} (edge {edge})",
                    self.secondary.name(),
                    self.primary.name(),
                    primary.sell.amount_out,
                ),
                kind: OpportunityKind::Open,
                legs: vec![buy_leg, sell_leg],
            },
        ))
    }

    /// A leg that executes prepared router calldata. Quotes that came back
    /// without calldata are not executable.
    fn router_leg(&self, venue: &str, symbol: &str, quote: &LiquidityQuote) -> Option<Leg> {
        let Some(execution) = quote.execution.clone() else {
            debug!(%venue, %symbol, "Quote has no execution payload, skipping");
            return None;
        };
        Some(Leg {
            venue: venue.to_string(),
            request: OrderRequest {
                instrument: symbol.to_string(),
                side: quote.side,
                amount_in: quote.amount_in,
                detail: OrderDetail::RouterCall(execution),
            },
        })
    }

    /// A marketable limit order priced at the quote's average executable
    /// price.
    fn book_leg(&self, venue: &str, symbol: &str, quote: &LiquidityQuote) -> Option<Leg> {
        if quote.amount_in.is_zero() || quote.amount_out.is_zero() {
            return None;
        }
        let (price, base_amount) = match quote.side {
            // Buying spends quote units for base out.
            Side::Buy => (quote.amount_in / quote.amount_out, quote.amount_out),
            // Selling offers base in for quote out.
            Side::Sell => (quote.amount_out / quote.amount_in, quote.amount_in),
        };
        Some(Leg {
            venue: venue.to_string(),
            request: OrderRequest {
                instrument: symbol.to_string(),
                side: quote.side,
                amount_in: quote.amount_in,
                detail: OrderDetail::BookLimit {
                    price: round_to_precision(price, 8),
                    base_amount,
                },
            },
        })
    }

    async fn dump_market_data(&self, venue: &str, data: &MarketData) {
        let path = format!("{}/{}-market-data.json", self.trade.dump_dir, venue.to_lowercase());
        match serde_json::to_vec_pretty(data) {
            Ok(bytes) => {
                if let Err(err) = tokio::fs::create_dir_all(&self.trade.dump_dir).await {
                    warn!(%path, error = %err, "Failed to create dump directory");
                    return;
                }
                if let Err(err) = tokio::fs::write(&path, bytes).await {
                    warn!(%path, error = %err, "Failed to dump market data");
                }
            }
            Err(err) => warn!(%path, error = %err, "Failed to serialize market data"),
        }
    }
}

/// Build a quote table from static prices, for paper trading and tests.
///
/// `premium` inflates sell-side proceeds (a venue paying 1% over fair
/// value has `premium = 0.01`); `router` attaches a placeholder execution
/// payload so the quotes are tradeable through the scanner.
pub fn static_quote_table(
    symbols: &[String],
    values: &[Decimal],
    prices: &std::collections::HashMap<String, Decimal>,
    premium: Decimal,
    router: bool,
) -> QuoteTable {
    let execution = router.then(|| crate::venue::RouterCall {
        call_data: "0x".to_string(),
        value: Decimal::ZERO,
    });

    let mut table = QuoteTable::new();
    for symbol in symbols {
        let Some(price) = prices.get(symbol).copied() else {
            continue;
        };
        if price.is_zero() {
            continue;
        }
        for &value in values {
            let base = value / price;
            table.insert(
                symbol,
                value,
                SideQuotes {
                    buy: LiquidityQuote {
                        amount_in: value,
                        amount_out: base,
                        side: Side::Buy,
                        execution: execution.clone(),
                    },
                    sell: LiquidityQuote {
                        amount_in: base,
                        amount_out: value * (Decimal::ONE + premium),
                        side: Side::Sell,
                        execution: execution.clone(),
                    },
                },
            );
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::types::RouterCall;
    use crate::venue::MockVenue;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn trade_config() -> TradeConfig {
        TradeConfig {
            symbols: vec!["BTC".to_string()],
            input_values: vec![dec!(100)],
            rough_prices: HashMap::from([("BTC".to_string(), dec!(100000))]),
            min_edge: dec!(0.5),
            cycle_secs: 1,
            debug_dump: false,
            dump_dir: "data".to_string(),
        }
    }

    fn router_quote(amount_in: Decimal, amount_out: Decimal, side: Side) -> LiquidityQuote {
        LiquidityQuote {
            amount_in,
            amount_out,
            side,
            execution: Some(RouterCall {
                call_data: "0xdeadbeef".to_string(),
                value: Decimal::ZERO,
            }),
        }
    }

    fn book_quote(amount_in: Decimal, amount_out: Decimal, side: Side) -> LiquidityQuote {
        LiquidityQuote {
            amount_in,
            amount_out,
            side,
            execution: None,
        }
    }

    /// Primary table: buy 100 -> 0.001 BTC, sell 0.001 BTC -> 99.
    fn primary_table() -> QuoteTable {
        let mut table = QuoteTable::new();
        table.insert(
            "BTC",
            dec!(100),
            SideQuotes {
                buy: router_quote(dec!(100), dec!(0.001), Side::Buy),
                sell: router_quote(dec!(0.001), dec!(99), Side::Sell),
            },
        );
        table
    }

    /// Secondary table: buy 100 -> 0.00098 BTC, sell 0.001 BTC -> 102.
    fn secondary_table() -> QuoteTable {
        let mut table = QuoteTable::new();
        table.insert(
            "BTC",
            dec!(100),
            SideQuotes {
                buy: book_quote(dec!(100), dec!(0.00098), Side::Buy),
                sell: book_quote(dec!(0.001), dec!(102), Side::Sell),
            },
        );
        table
    }

    async fn scanner_with(
        primary_data: MarketData,
        secondary_data: MarketData,
        trade: TradeConfig,
    ) -> OpportunityScanner {
        let primary = Arc::new(MockVenue::new("Prism"));
        primary.set_market_data(primary_data).await;
        let secondary = Arc::new(MockVenue::new("Quill"));
        secondary.set_market_data(secondary_data).await;
        OpportunityScanner::new(primary, secondary, trade)
    }

    #[tokio::test]
    async fn emits_outbound_opportunity_when_edge_clears_threshold() {
        let scanner = scanner_with(
            MarketData::available(primary_table()),
            MarketData::available(secondary_table()),
            trade_config(),
        )
        .await;

        let opportunities = scanner.find_opportunities().await;

        // Outbound: sell on Quill returns 102 for 100 in, edge 2.
        assert_eq!(opportunities.len(), 1);
        let opp = &opportunities[0];
        assert_eq!(opp.kind, OpportunityKind::Open);
        assert_eq!(opp.legs.len(), 2);
        assert_eq!(opp.legs[0].venue, "Prism");
        assert_eq!(opp.legs[0].request.side, Side::Buy);
        assert!(matches!(
            opp.legs[0].request.detail,
            OrderDetail::RouterCall(_)
        ));
        assert_eq!(opp.legs[1].venue, "Quill");
        assert_eq!(opp.legs[1].request.side, Side::Sell);
        assert!(matches!(
            opp.legs[1].request.detail,
            OrderDetail::BookLimit { .. }
        ));
    }

    #[tokio::test]
    async fn below_threshold_edges_are_ignored() {
        let mut trade = trade_config();
        trade.min_edge = dec!(5);
        let scanner = scanner_with(
            MarketData::available(primary_table()),
            MarketData::available(secondary_table()),
            trade,
        )
        .await;

        assert!(scanner.find_opportunities().await.is_empty());
    }

    #[tokio::test]
    async fn unavailable_primary_yields_empty_not_error() {
        let scanner = scanner_with(
            MarketData::unavailable(),
            MarketData::available(secondary_table()),
            trade_config(),
        )
        .await;

        assert!(scanner.find_opportunities().await.is_empty());
    }

    #[tokio::test]
    async fn unavailable_secondary_yields_empty() {
        let scanner = scanner_with(
            MarketData::available(primary_table()),
            MarketData::unavailable(),
            trade_config(),
        )
        .await;

        assert!(scanner.find_opportunities().await.is_empty());
    }

    #[tokio::test]
    async fn quote_without_execution_payload_is_not_tradeable() {
        // Same edge, but the primary buy quote lost its calldata.
        let mut table = QuoteTable::new();
        table.insert(
            "BTC",
            dec!(100),
            SideQuotes {
                buy: book_quote(dec!(100), dec!(0.001), Side::Buy),
                sell: book_quote(dec!(0.001), dec!(99), Side::Sell),
            },
        );
        let scanner = scanner_with(
            MarketData::available(table),
            MarketData::available(secondary_table()),
            trade_config(),
        )
        .await;

        assert!(scanner.find_opportunities().await.is_empty());
    }

    #[tokio::test]
    async fn opportunities_are_sorted_best_edge_first() {
        // Make the return direction profitable too, with a bigger edge:
        // primary sell returns 110 for 100 in.
        let mut primary = primary_table();
        primary.insert(
            "BTC",
            dec!(100),
            SideQuotes {
                buy: router_quote(dec!(100), dec!(0.001), Side::Buy),
                sell: router_quote(dec!(0.001), dec!(110), Side::Sell),
            },
        );
        let scanner = scanner_with(
            MarketData::available(primary),
            MarketData::available(secondary_table()),
            trade_config(),
        )
        .await;

        let opportunities = scanner.find_opportunities().await;
        assert_eq!(opportunities.len(), 2);
        // Return direction (edge 10) outranks outbound (edge 2).
        assert_eq!(opportunities[0].legs[0].venue, "Quill");
        assert_eq!(opportunities[1].legs[0].venue, "Prism");
    }

    #[test]
    fn static_quote_table_prices_both_sides() {
        let table = static_quote_table(
            &["BTC".to_string()],
            &[dec!(100)],
            &HashMap::from([("BTC".to_string(), dec!(100000))]),
            dec!(0.01),
            true,
        );
        let quotes = table.get("BTC", dec!(100)).unwrap();
        assert_eq!(quotes.buy.amount_out, dec!(0.001));
        assert_eq!(quotes.sell.amount_out, dec!(101));
        assert!(quotes.buy.execution.is_some());
    }
}
