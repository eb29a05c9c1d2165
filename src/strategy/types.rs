//! Strategy-level domain model: opportunities in, receipts out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::venue::{InternalPosition, OrderRequest, PositionStatus};

/// One order to place on one venue. A leg is consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    /// Venue name, resolved against the coordinator's venue map.
    pub venue: String,
    pub request: OrderRequest,
}

/// What an opportunity does to the book of positions.
#[derive(Debug, Clone, PartialEq)]
pub enum OpportunityKind {
    Open,
    Edit { position_id: String },
    Close { position_id: String },
}

/// A candidate trade action: one or more legs, executed in order.
/// Immutable once produced; consumed at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub description: String,
    pub kind: OpportunityKind,
    pub legs: Vec<Leg>,
}

/// A strategy-owned position aggregating the venue-side legs that
/// created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub status: PositionStatus,
    pub internal_positions: Vec<InternalPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Failed,
}

/// Durable record of one opportunity execution attempt. Every attempt
/// produces exactly one receipt; success requires every leg filled, and a
/// failed receipt carries no positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub status: ReceiptStatus,
    pub positions: Vec<Position>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
