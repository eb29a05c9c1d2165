//! Prism aggregator client.
//!
//! Single-quote venue: one exact-in quote per (token, value, side), no raw
//! depth. Execution goes through a relay service that owns transaction
//! signing and receipt decoding; a swap that reached the chain cannot be
//! cancelled.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use super::types::*;
use crate::config::PrismConfig;
use crate::error::VenueError;
use crate::utils::decimal::round_to_precision;
use crate::venue::traits::VenueAdapter;
use crate::venue::types::{
    Correlation, Fill, InternalPosition, LiquidityQuote, MarketData, MarketDataRequest,
    OrderDetail, OrderHandle, OrderOutcome, OrderRequest, QuoteTable, RouterCall, Side, SideQuotes,
};

const VENUE: &str = "Prism";

/// Prism quote + relay client.
pub struct PrismClient {
    http: Client,
    quote_url: String,
    relay_url: String,
    chain_id: u64,
    slippage_bps: u32,
    quote_deadline_secs: u64,
}

impl PrismClient {
    /// Create a new Prism client from configuration.
    pub fn new(config: &PrismConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            quote_url: config.quote_url.clone(),
            relay_url: config.relay_url.trim_end_matches('/').to_string(),
            chain_id: config.chain_id,
            slippage_bps: config.slippage_bps,
            quote_deadline_secs: config.quote_deadline_secs,
        })
    }

    fn transport(&self, message: impl ToString) -> VenueError {
        VenueError::transport(VENUE, message)
    }

    fn validation(&self, message: impl ToString) -> VenueError {
        VenueError::validation(VENUE, message)
    }

    /// Scale a human amount to the token's smallest units, truncating.
    fn to_base_units(amount: Decimal, decimals: u32) -> Decimal {
        (amount / Decimal::new(1, decimals)).trunc()
    }

    /// Scale a smallest-units string back to human units.
    fn from_base_units(units: &str, decimals: u32) -> Option<Decimal> {
        let raw: Decimal = units.parse().ok()?;
        Some(raw * Decimal::new(1, decimals))
    }

    fn parse_hex_value(value: &str) -> Decimal {
        u64::from_str_radix(value.trim_start_matches("0x"), 16)
            .map(Decimal::from)
            .unwrap_or(Decimal::ZERO)
    }

    /// Request one exact-in quote.
    #[instrument(
        skip_all,
        name = "prism_quote",
        fields(token_in = token_in.symbol, token_out = token_out.symbol)
    )]
    async fn fetch_quote(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: Decimal,
    ) -> Result<QuoteApiResponse, VenueError> {
        let amount_units = Self::to_base_units(amount_in, token_in.decimals);
        let url = format!(
            "{}?tokenInAddress={}&tokenOutAddress={}&amount={}&type=exactIn\
             &tokenInChainId={}&tokenOutChainId={}&protocols={}\
             &enableUniversalRouter=true&slippageTolerance={}&deadline={}",
            self.quote_url,
            urlencoding::encode(token_in.address),
            urlencoding::encode(token_out.address),
            amount_units,
            self.chain_id,
            self.chain_id,
            urlencoding::encode("v2,v3,mixed"),
            self.slippage_bps,
            self.quote_deadline_secs,
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.transport(format!("quote api returned http {status}")));
        }

        let body: QuoteApiResponse = response.json().await.map_err(|e| self.validation(e))?;
        if let Some(code) = &body.error_code {
            return Err(self.transport(format!("quote api error: {code}")));
        }
        Ok(body)
    }

    /// Turn a raw quote response into an executable LiquidityQuote.
    fn quote_from_response(
        &self,
        response: QuoteApiResponse,
        token_out: &Token,
        amount_in: Decimal,
        side: Side,
    ) -> LiquidityQuote {
        let amount_out = response
            .quote
            .as_deref()
            .and_then(|q| Self::from_base_units(q, token_out.decimals))
            .unwrap_or(Decimal::ZERO);
        let execution = response.method_parameters.map(|p| RouterCall {
            call_data: p.calldata,
            value: Self::parse_hex_value(&p.value),
        });

        LiquidityQuote {
            amount_in,
            amount_out,
            side,
            execution,
        }
    }

    fn zero_quote(amount_in: Decimal, side: Side) -> LiquidityQuote {
        LiquidityQuote {
            amount_in,
            amount_out: Decimal::ZERO,
            side,
            execution: None,
        }
    }

    /// Quote both directions for one symbol at one target value.
    async fn quote_pair(
        &self,
        symbol: &str,
        value: Decimal,
        rough_price: Decimal,
    ) -> Option<(Decimal, SideQuotes)> {
        let usdc = token_for("USDC")?;
        let token = token_for(symbol)?;

        let sell_base = round_to_precision(value / rough_price, token.decimals);

        let (buy, sell) = tokio::join!(
            self.fetch_quote(usdc, token, value),
            self.fetch_quote(token, usdc, sell_base),
        );

        let buy = match buy {
            Ok(response) => self.quote_from_response(response, token, value, Side::Buy),
            Err(err) => {
                warn!(%symbol, %value, error = %err, "Buy quote failed, using zero quote");
                Self::zero_quote(value, Side::Buy)
            }
        };
        let sell = match sell {
            Ok(response) => self.quote_from_response(response, usdc, sell_base, Side::Sell),
            Err(err) => {
                warn!(%symbol, %value, error = %err, "Sell quote failed, using zero quote");
                Self::zero_quote(sell_base, Side::Sell)
            }
        };

        Some((value, SideQuotes { buy, sell }))
    }
}

#[async_trait]
impl VenueAdapter for PrismClient {
    fn name(&self) -> &str {
        VENUE
    }

    /// A routed swap settles atomically on-chain; nothing to cancel.
    fn supports_cancel(&self) -> bool {
        false
    }

    #[instrument(skip(self, request), name = "prism_create_order", fields(instrument = %request.instrument))]
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderHandle, VenueError> {
        let OrderDetail::RouterCall(call) = &request.detail else {
            return Err(VenueError::NotSupported {
                venue: VENUE.to_string(),
                operation: "book orders",
            });
        };

        let url = format!("{}/execute", self.relay_url);
        let response = self
            .http
            .post(&url)
            .json(call)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.transport(format!("relay returned http {status}")));
        }

        let body: ExecuteResponse = response.json().await.map_err(|e| self.validation(e))?;
        debug!(tx_hash = %body.tx_hash, "Router call submitted");

        Ok(OrderHandle {
            id: uuid::Uuid::new_v4().to_string(),
            venue: VENUE.to_string(),
            instrument: request.instrument.clone(),
            correlation: Correlation::Chain {
                tx_hash: body.tx_hash,
            },
        })
    }

    async fn cancel_order(&self, _handle: &OrderHandle) -> Result<(), VenueError> {
        // Idempotent no-op: the swap either lands or reverts on its own.
        Ok(())
    }

    #[instrument(skip(self, handle), name = "prism_order_result", fields(order = %handle.id))]
    async fn get_order_result(&self, handle: &OrderHandle) -> Result<OrderOutcome, VenueError> {
        let Correlation::Chain { tx_hash } = &handle.correlation else {
            return Err(self.validation("handle does not belong to this venue"));
        };

        // The relay long-polls the chain; "pending" only comes back if its
        // internal wait timed out.
        let url = format!("{}/receipt/{}?wait=true", self.relay_url, tx_hash);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.transport(format!("relay returned http {status}")));
        }

        let receipt: RelayReceipt = response.json().await.map_err(|e| self.validation(e))?;
        match receipt.status.as_str() {
            "success" => {
                let amount_out = receipt
                    .amount_out
                    .ok_or_else(|| self.validation("success receipt missing amount_out"))?;
                Ok(OrderOutcome::Filled(Fill {
                    instrument: handle.instrument.clone(),
                    amount_out,
                }))
            }
            "reverted" => Ok(OrderOutcome::Canceled),
            "pending" => Ok(OrderOutcome::Pending),
            other => Err(self.validation(format!("unknown receipt status: {other}"))),
        }
    }

    #[instrument(skip(self, request), name = "prism_market_data")]
    async fn get_market_data(&self, request: &MarketDataRequest) -> MarketData {
        let mut table = QuoteTable::new();

        for symbol in &request.symbols {
            let Some(rough_price) = request.rough_prices.get(symbol).copied() else {
                warn!(%symbol, "No rough price, market data unavailable");
                return MarketData::unavailable();
            };
            if token_for(symbol).is_none() {
                warn!(%symbol, "Unknown token, market data unavailable");
                return MarketData::unavailable();
            }

            // One request per (value, side); all values fan out together.
            let quotes = join_all(
                request
                    .values
                    .iter()
                    .map(|&value| self.quote_pair(symbol, value, rough_price)),
            )
            .await;

            for (value, side_quotes) in quotes.into_iter().flatten() {
                table.insert(symbol, value, side_quotes);
            }
        }

        MarketData::available(table)
    }

    async fn get_position(&self, _id: &str) -> Result<InternalPosition, VenueError> {
        Err(VenueError::NotSupported {
            venue: VENUE.to_string(),
            operation: "get_position",
        })
    }
}
