//! Venue-agnostic adapter contract.
//!
//! One implementation per execution venue (order-book exchange, DEX
//! aggregator, mock). Pure boundary: adapters translate wire formats, the
//! strategy layer owns every decision.

use async_trait::async_trait;

use crate::error::VenueError;
use crate::venue::types::{
    InternalPosition, MarketData, MarketDataRequest, OrderHandle, OrderOutcome, OrderRequest,
};

/// Uniform capability set consumed by the opportunity scanner and the
/// execution coordinator. Implementations must be `Send + Sync` so the
/// strategy can hold them behind `Arc<dyn VenueAdapter>`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Stable venue name used as the key in the venue map and in logs.
    fn name(&self) -> &str;

    /// Whether a cancel request means anything on this venue. A settled
    /// on-chain swap has nothing to cancel.
    fn supports_cancel(&self) -> bool {
        true
    }

    /// Submit an order. Fails with a retryable [`VenueError::Transport`] on
    /// transport trouble, [`VenueError::Validation`] on contract breakage.
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderHandle, VenueError>;

    /// Cancel an order. Idempotent; a no-op if the order is already
    /// terminal.
    async fn cancel_order(&self, handle: &OrderHandle) -> Result<(), VenueError>;

    /// Resolve the current outcome of an order. Never fails merely because
    /// the order is non-terminal; `Pending`/`Live` are valid results.
    async fn get_order_result(&self, handle: &OrderHandle) -> Result<OrderOutcome, VenueError>;

    /// Fetch the venue's executable market view. Infallible by contract:
    /// any failure degrades to `is_available == false` for this cycle.
    async fn get_market_data(&self, request: &MarketDataRequest) -> MarketData;

    /// Look up a venue-side position. Venues without position introspection
    /// return [`VenueError::NotSupported`].
    async fn get_position(&self, id: &str) -> Result<InternalPosition, VenueError>;
}
