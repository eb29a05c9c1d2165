//! Quill REST API client.
//!
//! Order-book perp venue: orders are signed transactions addressed by
//! market index and client order index; market data is raw book depth that
//! gets depth-walked into executable quotes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use super::types::*;
use crate::config::QuillConfig;
use crate::error::VenueError;
use crate::pricing::{self, DepthLevel};
use crate::utils::decimal::round_down_to_lot;
use crate::venue::traits::VenueAdapter;
use crate::venue::types::{
    Correlation, Fill, InternalPosition, LiquidityQuote, MarketData, MarketDataRequest,
    OrderDetail, OrderHandle, OrderOutcome, OrderRequest, QuoteTable, Side, SideQuotes,
};

const VENUE: &str = "Quill";

/// Quill API client.
pub struct QuillClient {
    http: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
    account_index: u32,
    /// Client order indices must be unique per account; seeded from the
    /// clock so restarts do not collide with resting orders.
    order_counter: AtomicU64,
}

impl QuillClient {
    /// Create a new Quill client from configuration.
    pub fn new(config: &QuillConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            account_index: config.account_index,
            order_counter: AtomicU64::new(Utc::now().timestamp_millis() as u64),
        })
    }

    /// Generate HMAC-SHA256 signature over a canonical payload string.
    fn sign(&self, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn next_client_order_index(&self) -> u64 {
        self.order_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn transport(&self, message: impl ToString) -> VenueError {
        VenueError::transport(VENUE, message)
    }

    fn validation(&self, message: impl ToString) -> VenueError {
        VenueError::validation(VENUE, message)
    }

    fn check_code(&self, code: i64, message: Option<&str>) -> Result<(), VenueError> {
        if code == CODE_OK {
            Ok(())
        } else {
            Err(self.transport(format!(
                "api code {code}: {}",
                message.unwrap_or("no message")
            )))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, VenueError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .header("X-API-KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.transport(format!("{path} returned http {status}")));
        }

        response.json().await.map_err(|e| self.validation(e))
    }

    /// Fetch the next transaction nonce for this account.
    #[instrument(skip(self), name = "quill_next_nonce")]
    async fn next_nonce(&self) -> Result<u64, VenueError> {
        let response: NextNonceResponse = self
            .get_json(
                "/api/v1/nextNonce",
                &[("account_index", self.account_index.to_string())],
            )
            .await?;
        self.check_code(response.code, response.message.as_deref())?;
        Ok(response.nonce)
    }

    /// Fetch the resting-order book for one market.
    #[instrument(skip(self), name = "quill_order_book")]
    async fn fetch_order_book(&self, symbol: &str) -> Result<OrderBookOrdersResponse, VenueError> {
        let market = market_for(symbol)
            .ok_or_else(|| self.validation(format!("unknown instrument: {symbol}")))?;

        let response: OrderBookOrdersResponse = self
            .get_json(
                "/api/v1/orderBookOrders",
                &[
                    ("market_id", market.market_index.to_string()),
                    ("limit", "100".to_string()),
                ],
            )
            .await?;
        self.check_code(response.code, response.message.as_deref())?;
        Ok(response)
    }

    async fn fetch_account_orders(
        &self,
        market_index: u32,
        active: bool,
    ) -> Result<AccountOrdersResponse, VenueError> {
        let response: AccountOrdersResponse = self
            .get_json(
                "/api/v1/accountOrders",
                &[
                    ("account_index", self.account_index.to_string()),
                    ("market_id", market_index.to_string()),
                    ("active", active.to_string()),
                    ("limit", "50".to_string()),
                ],
            )
            .await?;
        self.check_code(response.code, response.message.as_deref())?;
        Ok(response)
    }

    async fn send_tx<T: serde::Serialize>(
        &self,
        request: &SendTxRequest<T>,
    ) -> Result<SendTxResponse, VenueError> {
        let url = format!("{}/api/v1/sendTx", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.transport(format!("sendTx returned http {status}")));
        }

        let body: SendTxResponse = response.json().await.map_err(|e| self.validation(e))?;
        self.check_code(body.code, body.message.as_deref())?;
        Ok(body)
    }

    fn map_order(&self, instrument: &str, order: &ApiOrder) -> OrderOutcome {
        match order.status.as_str() {
            "filled" => OrderOutcome::Filled(Fill {
                instrument: instrument.to_string(),
                // Sells receive quote currency, buys receive base.
                amount_out: if order.is_ask {
                    order.filled_quote_amount
                } else {
                    order.filled_base_amount
                },
            }),
            "open" => OrderOutcome::Live,
            "pending" | "in-progress" => OrderOutcome::Pending,
            "partially-filled" => OrderOutcome::PartiallyFilled,
            status if status.starts_with("canceled") => OrderOutcome::Canceled,
            status => {
                warn!(%status, "Unknown order status, treating as pending");
                OrderOutcome::Pending
            }
        }
    }

    fn level_from(order: &BookOrder) -> DepthLevel {
        DepthLevel {
            price: order.price,
            remaining: order.remaining_base_amount,
        }
    }

    /// Depth-walk one book into both-direction quotes for each target value.
    fn quotes_for_book(
        book: &OrderBookOrdersResponse,
        symbol: &str,
        request: &MarketDataRequest,
        table: &mut QuoteTable,
    ) {
        let Some(rough_price) = request.rough_prices.get(symbol).copied() else {
            warn!(%symbol, "No rough price, skipping sell quotes");
            return;
        };
        let lot_size = market_for(symbol)
            .map(|m| Decimal::new(1, m.size_decimals))
            .unwrap_or(Decimal::ZERO);

        let asks: Vec<DepthLevel> = book.asks.iter().map(Self::level_from).collect();
        let bids: Vec<DepthLevel> = book.bids.iter().map(Self::level_from).collect();

        for &value in &request.values {
            let buy_fill = pricing::walk_asks(&asks, value);

            let base_in = round_down_to_lot(value / rough_price, lot_size);
            let sell_fill = pricing::walk_bids(&bids, base_in);

            table.insert(
                symbol,
                value,
                SideQuotes {
                    buy: LiquidityQuote {
                        amount_in: value,
                        amount_out: buy_fill.amount_out,
                        side: Side::Buy,
                        execution: None,
                    },
                    sell: LiquidityQuote {
                        amount_in: base_in,
                        amount_out: sell_fill.amount_out,
                        side: Side::Sell,
                        execution: None,
                    },
                },
            );
        }
    }
}

#[async_trait]
impl VenueAdapter for QuillClient {
    fn name(&self) -> &str {
        VENUE
    }

    #[instrument(skip(self, request), name = "quill_create_order", fields(instrument = %request.instrument))]
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderHandle, VenueError> {
        let OrderDetail::BookLimit { price, base_amount } = &request.detail else {
            return Err(VenueError::NotSupported {
                venue: VENUE.to_string(),
                operation: "router execution",
            });
        };
        let market = market_for(&request.instrument)
            .ok_or_else(|| self.validation(format!("unknown instrument: {}", request.instrument)))?;

        let nonce = self.next_nonce().await?;
        let client_order_index = self.next_client_order_index();
        let is_ask = u8::from(request.side == Side::Sell);
        let order_expiry = Utc::now().timestamp() + DEFAULT_ORDER_EXPIRY_SECS;

        let payload = format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            market.market_index,
            client_order_index,
            base_amount,
            price,
            is_ask,
            ORDER_TYPE_LIMIT,
            TIME_IN_FORCE_GOOD_TILL_TIME,
            0,
            0,
            order_expiry,
            nonce,
        );
        let tx = CreateOrderTx {
            market_index: market.market_index,
            client_order_index,
            base_amount: base_amount.to_string(),
            price: price.to_string(),
            is_ask,
            order_type: ORDER_TYPE_LIMIT,
            time_in_force: TIME_IN_FORCE_GOOD_TILL_TIME,
            reduce_only: 0,
            trigger_price: "0".to_string(),
            order_expiry,
            nonce,
            sig: self.sign(&payload),
        };

        let response = self
            .send_tx(&SendTxRequest {
                tx_type: TX_TYPE_CREATE_ORDER,
                tx_info: tx,
                price_protection: Some(true),
            })
            .await?;

        let id = response
            .tx_hash
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        debug!(%id, client_order_index, "Order submitted");

        Ok(OrderHandle {
            id,
            venue: VENUE.to_string(),
            instrument: request.instrument.clone(),
            correlation: Correlation::Book {
                market_index: market.market_index,
                client_order_index,
                nonce,
            },
        })
    }

    #[instrument(skip(self, handle), name = "quill_cancel_order", fields(order = %handle.id))]
    async fn cancel_order(&self, handle: &OrderHandle) -> Result<(), VenueError> {
        let Correlation::Book {
            market_index,
            client_order_index,
            ..
        } = handle.correlation
        else {
            return Err(self.validation("handle does not belong to this venue"));
        };

        let nonce = self.next_nonce().await?;
        let payload = format!("{market_index}:{client_order_index}:{nonce}");
        let tx = CancelOrderTx {
            market_index,
            order_index: client_order_index,
            nonce,
            sig: self.sign(&payload),
        };

        self.send_tx(&SendTxRequest {
            tx_type: TX_TYPE_CANCEL_ORDER,
            tx_info: tx,
            price_protection: None,
        })
        .await?;

        debug!(order = %handle.id, "Cancel submitted");
        Ok(())
    }

    #[instrument(skip(self, handle), name = "quill_order_result", fields(order = %handle.id))]
    async fn get_order_result(&self, handle: &OrderHandle) -> Result<OrderOutcome, VenueError> {
        let Correlation::Book {
            market_index,
            client_order_index,
            ..
        } = handle.correlation
        else {
            return Err(self.validation("handle does not belong to this venue"));
        };

        let active = self.fetch_account_orders(market_index, true).await?;
        if let Some(order) = active
            .orders
            .iter()
            .find(|o| o.client_order_index == client_order_index)
        {
            return Ok(self.map_order(&handle.instrument, order));
        }

        let inactive = self.fetch_account_orders(market_index, false).await?;
        if let Some(order) = inactive
            .orders
            .iter()
            .find(|o| o.client_order_index == client_order_index)
        {
            return Ok(self.map_order(&handle.instrument, order));
        }

        // Not visible on either list yet: still propagating.
        Ok(OrderOutcome::Pending)
    }

    #[instrument(skip(self, request), name = "quill_market_data")]
    async fn get_market_data(&self, request: &MarketDataRequest) -> MarketData {
        let books = join_all(
            request
                .symbols
                .iter()
                .map(|symbol| self.fetch_order_book(symbol)),
        )
        .await;

        let mut table = QuoteTable::new();
        for (symbol, book) in request.symbols.iter().zip(books) {
            match book {
                Ok(book) => Self::quotes_for_book(&book, symbol, request, &mut table),
                Err(err) => {
                    warn!(%symbol, error = %err, "Order book fetch failed, market data unavailable");
                    return MarketData::unavailable();
                }
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> QuillClient {
        QuillClient::new(&QuillConfig {
            base_url: server.uri(),
            api_key: "key".to_string(),
            secret_key: "secret".to_string(),
            account_index: 1,
        })
        .unwrap()
    }

    fn market_request() -> MarketDataRequest {
        MarketDataRequest {
            symbols: vec!["BTC".to_string()],
            values: vec![dec!(150)],
            rough_prices: HashMap::from([("BTC".to_string(), dec!(100))]),
        }
    }

    fn book_body() -> serde_json::Value {
        json!({
            "code": 200,
            "total_asks": 2,
            "asks": [
                {
                    "order_index": 1, "owner_account_index": 9,
                    "initial_base_amount": "1", "remaining_base_amount": "1",
                    "price": "100", "order_expiry": 0
                },
                {
                    "order_index": 2, "owner_account_index": 9,
                    "initial_base_amount": "5", "remaining_base_amount": "5",
                    "price": "101", "order_expiry": 0
                }
            ],
            "total_bids": 1,
            "bids": [
                {
                    "order_index": 3, "owner_account_index": 9,
                    "initial_base_amount": "10", "remaining_base_amount": "10",
                    "price": "99", "order_expiry": 0
                }
            ]
        })
    }

    #[tokio::test]
    async fn market_data_depth_walks_the_book() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orderBookOrders"))
            .and(query_param("market_id", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(book_body()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let data = client.get_market_data(&market_request()).await;

        assert!(data.is_available);
        let quotes = data.quotes.get("BTC", dec!(150)).unwrap();
        assert_eq!(quotes.buy.amount_out, dec!(1) + dec!(50) / dec!(101));
        // 150 / rough 100 = 1.5 base sold into the 99 bid.
        assert_eq!(quotes.sell.amount_in, dec!(1.5));
        assert_eq!(quotes.sell.amount_out, dec!(1.5) * dec!(99));
    }

    #[tokio::test]
    async fn market_data_degrades_to_unavailable_on_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orderBookOrders"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let data = client.get_market_data(&market_request()).await;
        assert!(!data.is_available);
        assert!(data.quotes.is_empty());
    }

    #[tokio::test]
    async fn malformed_book_is_a_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orderBookOrders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_order_book("BTC").await.unwrap_err();
        assert!(matches!(err, VenueError::Validation { .. }));
    }

    #[tokio::test]
    async fn order_result_maps_filled_ask_to_quote_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accountOrders"))
            .and(query_param("active", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "orders": [{
                    "client_order_index": 42,
                    "market_index": 1,
                    "status": "filled",
                    "is_ask": true,
                    "filled_base_amount": "1.5",
                    "filled_quote_amount": "148.5",
                    "remaining_base_amount": "0"
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let handle = OrderHandle {
            id: "abc".to_string(),
            venue: VENUE.to_string(),
            instrument: "BTC".to_string(),
            correlation: Correlation::Book {
                market_index: 1,
                client_order_index: 42,
                nonce: 7,
            },
        };

        let outcome = client.get_order_result(&handle).await.unwrap();
        assert_eq!(outcome.fill().unwrap().amount_out, dec!(148.5));
    }

    #[tokio::test]
    async fn missing_order_is_pending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accountOrders"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"code": 200, "orders": []})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let handle = OrderHandle {
            id: "abc".to_string(),
            venue: VENUE.to_string(),
            instrument: "BTC".to_string(),
            correlation: Correlation::Book {
                market_index: 1,
                client_order_index: 42,
                nonce: 7,
            },
        };

        let outcome = client.get_order_result(&handle).await.unwrap();
        assert_eq!(outcome, OrderOutcome::Pending);
    }
}
