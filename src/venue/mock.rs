//! Scripted in-memory venue for paper trading and tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::error::VenueError;
use crate::venue::traits::VenueAdapter;
use crate::venue::types::{
    Correlation, Fill, InternalPosition, MarketData, MarketDataRequest, OrderHandle, OrderOutcome,
    OrderRequest,
};

/// Scripted behavior for a [`MockVenue`].
#[derive(Debug, Default)]
struct Script {
    /// Create calls that fail with a transport error before one succeeds.
    failing_creates: u32,
    /// Poll calls that fail with a transport error before one succeeds.
    failing_polls: u32,
    /// Cancel calls that fail with a transport error before one succeeds.
    failing_cancels: u32,
    /// Successive poll results; the last entry repeats once drained.
    outcomes: VecDeque<OrderOutcome>,
    market_data: Option<MarketData>,
}

/// In-memory venue with configurable failure injection and call counters.
pub struct MockVenue {
    name: String,
    cancellable: bool,
    script: Mutex<Script>,
    order_counter: AtomicU64,
    create_calls: AtomicU32,
    cancel_calls: AtomicU32,
    poll_calls: AtomicU32,
}

impl MockVenue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cancellable: true,
            script: Mutex::new(Script::default()),
            order_counter: AtomicU64::new(1),
            create_calls: AtomicU32::new(0),
            cancel_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
        }
    }

    /// A venue whose orders settle irrevocably; cancel is meaningless.
    pub fn non_cancellable(name: &str) -> Self {
        let mut venue = Self::new(name);
        venue.cancellable = false;
        venue
    }

    pub async fn fail_creates(&self, count: u32) {
        self.script.lock().await.failing_creates = count;
    }

    pub async fn fail_polls(&self, count: u32) {
        self.script.lock().await.failing_polls = count;
    }

    pub async fn fail_cancels(&self, count: u32) {
        self.script.lock().await.failing_cancels = count;
    }

    /// Script the poll results, consumed in order; the last repeats.
    pub async fn script_outcomes(&self, outcomes: Vec<OrderOutcome>) {
        self.script.lock().await.outcomes = outcomes.into();
    }

    pub async fn set_market_data(&self, data: MarketData) {
        self.script.lock().await.market_data = Some(data);
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> u32 {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    fn transport_err(&self, message: &str) -> VenueError {
        VenueError::transport(self.name.clone(), message)
    }
}

#[async_trait]
impl VenueAdapter for MockVenue {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_cancel(&self) -> bool {
        self.cancellable
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderHandle, VenueError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut script = self.script.lock().await;
        if script.failing_creates > 0 {
            script.failing_creates -= 1;
            return Err(self.transport_err("scripted create failure"));
        }

        let index = self.order_counter.fetch_add(1, Ordering::SeqCst);
        Ok(OrderHandle {
            id: format!("mock-{index}"),
            venue: self.name.clone(),
            instrument: request.instrument.clone(),
            correlation: Correlation::Book {
                market_index: 0,
                client_order_index: index,
                nonce: index,
            },
        })
    }

    async fn cancel_order(&self, _handle: &OrderHandle) -> Result<(), VenueError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);

        let mut script = self.script.lock().await;
        if script.failing_cancels > 0 {
            script.failing_cancels -= 1;
            return Err(self.transport_err("scripted cancel failure"));
        }
        Ok(())
    }

    async fn get_order_result(&self, handle: &OrderHandle) -> Result<OrderOutcome, VenueError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);

        let mut script = self.script.lock().await;
        if script.failing_polls > 0 {
            script.failing_polls -= 1;
            return Err(self.transport_err("scripted poll failure"));
        }

        let outcome = if script.outcomes.len() > 1 {
            script.outcomes.pop_front().unwrap()
        } else if let Some(last) = script.outcomes.front() {
            last.clone()
        } else {
            OrderOutcome::Filled(Fill {
                instrument: handle.instrument.clone(),
                amount_out: Decimal::ONE,
            })
        };
        Ok(outcome)
    }

    async fn get_market_data(&self, _request: &MarketDataRequest) -> MarketData {
        self.script
            .lock()
            .await
            .market_data
            .clone()
            .unwrap_or_else(MarketData::unavailable)
    }

    async fn get_position(&self, _id: &str) -> Result<InternalPosition, VenueError> {
        Err(VenueError::NotSupported {
            venue: self.name.clone(),
            operation: "get_position",
        })
    }
}
