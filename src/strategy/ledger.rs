//! In-memory position/receipt ledger.
//!
//! The only mutable shared state in the pipeline. Mutation happens solely
//! as the atomic result of one opportunity's execution; readers never
//! observe a half-written position/receipt pair.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{Position, Receipt};

/// Serializable full contents of the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub positions: HashMap<String, Position>,
    pub receipts: HashMap<String, Receipt>,
}

/// Id-keyed store of positions and receipts.
#[derive(Debug, Default)]
pub struct Ledger {
    state: RwLock<LedgerSnapshot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the ledger from a persisted snapshot.
    pub fn hydrate(snapshot: LedgerSnapshot) -> Self {
        debug!(
            positions = snapshot.positions.len(),
            receipts = snapshot.receipts.len(),
            "Ledger hydrated"
        );
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Record one execution attempt: the receipt and every position it
    /// carries land under a single write lock.
    pub async fn record(&self, receipt: Receipt) {
        let mut state = self.state.write().await;
        for position in &receipt.positions {
            state.positions.insert(position.id.clone(), position.clone());
        }
        state.receipts.insert(receipt.id.clone(), receipt);
    }

    pub async fn position(&self, id: &str) -> Option<Position> {
        self.state.read().await.positions.get(id).cloned()
    }

    pub async fn positions(&self) -> Vec<Position> {
        self.state.read().await.positions.values().cloned().collect()
    }

    pub async fn receipt(&self, id: &str) -> Option<Receipt> {
        self.state.read().await.receipts.get(id).cloned()
    }

    pub async fn receipts(&self) -> Vec<Receipt> {
        self.state.read().await.receipts.values().cloned().collect()
    }

    pub async fn receipt_count(&self) -> usize {
        self.state.read().await.receipts.len()
    }

    /// Clone the full contents for persistence.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::types::ReceiptStatus;
    use crate::venue::{InternalPosition, PositionStatus};
    use chrono::Utc;

    fn receipt_with_position(receipt_id: &str, position_id: &str) -> Receipt {
        Receipt {
            id: receipt_id.to_string(),
            status: ReceiptStatus::Success,
            positions: vec![Position {
                id: position_id.to_string(),
                status: PositionStatus::Opened,
                internal_positions: vec![InternalPosition {
                    id: "ip-1".to_string(),
                    venue: "Quill".to_string(),
                    status: PositionStatus::Opened,
                    instrument: "BTC".to_string(),
                }],
            }],
            description: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn record_lands_position_and_receipt_together() {
        let ledger = Ledger::new();
        ledger.record(receipt_with_position("r-1", "p-1")).await;

        assert!(ledger.position("p-1").await.is_some());
        assert!(ledger.receipt("r-1").await.is_some());
        assert_eq!(ledger.positions().await.len(), 1);
        assert_eq!(ledger.receipt_count().await, 1);
    }

    #[tokio::test]
    async fn failed_receipt_records_no_positions() {
        let ledger = Ledger::new();
        ledger
            .record(Receipt {
                id: "r-2".to_string(),
                status: ReceiptStatus::Failed,
                positions: vec![],
                description: "failed attempt".to_string(),
                created_at: Utc::now(),
            })
            .await;

        assert_eq!(ledger.positions().await.len(), 0);
        assert_eq!(ledger.receipt_count().await, 1);
    }

    #[tokio::test]
    async fn snapshot_hydrate_round_trip_is_lossless() {
        let ledger = Ledger::new();
        ledger.record(receipt_with_position("r-1", "p-1")).await;
        ledger.record(receipt_with_position("r-2", "p-2")).await;

        let snapshot = ledger.snapshot().await;
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        let hydrated = Ledger::hydrate(restored);

        assert_eq!(
            hydrated.position("p-1").await,
            ledger.position("p-1").await
        );
        assert_eq!(
            hydrated.receipt("r-2").await,
            ledger.receipt("r-2").await
        );
        assert_eq!(hydrated.receipt_count().await, 2);
    }

    #[tokio::test]
    async fn reads_are_clones_not_views() {
        let ledger = Ledger::new();
        ledger.record(receipt_with_position("r-1", "p-1")).await;

        let mut copy = ledger.position("p-1").await.unwrap();
        copy.status = PositionStatus::Closed;

        assert_eq!(
            ledger.position("p-1").await.unwrap().status,
            PositionStatus::Opened
        );
    }
}
