//! Strategy cycle driver.
//!
//! Ties scanning, execution and the ledger together once per scheduled
//! tick, and owns every ledger write. Cycles never overlap: a tick that
//! arrives while the previous cycle is still running is skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::persistence::SnapshotStore;
use crate::strategy::coordinator::ExecutionCoordinator;
use crate::strategy::ledger::{Ledger, LedgerSnapshot};
use crate::strategy::scanner::OpportunityScanner;
use crate::strategy::types::{Opportunity, Position, Receipt, ReceiptStatus};
use crate::venue::{InternalPosition, PositionStatus};

/// The strategy service: one instance per process, explicit hydrate on
/// startup and flush on shutdown.
pub struct StrategyService {
    scanner: OpportunityScanner,
    coordinator: ExecutionCoordinator,
    ledger: Ledger,
    store: SnapshotStore,
    cycle_secs: u64,
    /// Held for the duration of one cycle; `try_lock` makes overlapping
    /// ticks observable and skippable.
    cycle_guard: Mutex<()>,
}

impl StrategyService {
    /// Build the service, hydrating the ledger from the most recent
    /// snapshot. A missing or corrupt snapshot degrades to an empty ledger.
    pub async fn init(
        scanner: OpportunityScanner,
        coordinator: ExecutionCoordinator,
        store: SnapshotStore,
        cycle_secs: u64,
    ) -> Self {
        let snapshot: LedgerSnapshot = store.load(LedgerSnapshot::default()).await;
        info!(
            positions = snapshot.positions.len(),
            receipts = snapshot.receipts.len(),
            "Strategy service initialized"
        );

        Self {
            scanner,
            coordinator,
            ledger: Ledger::hydrate(snapshot),
            store,
            cycle_secs,
            cycle_guard: Mutex::new(()),
        }
    }

    /// Run one strategy cycle: find opportunities, execute each in order,
    /// record receipts, flush the snapshot if anything was recorded.
    ///
    /// Safe to invoke repeatedly; a call that arrives while another cycle
    /// is in flight returns empty instead of running concurrently.
    pub async fn process(&self) -> Vec<Receipt> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            warn!("Previous cycle still running, skipping this tick");
            return Vec::new();
        };

        let opportunities = self.scanner.find_opportunities().await;
        if opportunities.is_empty() {
            debug!("No opportunities this cycle");
            return Vec::new();
        }

        let mut receipts = Vec::with_capacity(opportunities.len());
        for opportunity in &opportunities {
            // One opportunity's failure never aborts its siblings.
            let receipt = self.execute(opportunity).await;
            receipts.push(receipt);
        }

        self.flush().await;
        receipts
    }

    /// Execute one opportunity and record the attempt. Every attempt yields
    /// a receipt: success with the new position, or failure with none.
    pub async fn execute(&self, opportunity: &Opportunity) -> Receipt {
        let receipt_id = Uuid::new_v4().to_string();

        let receipt = match self.run_legs(opportunity).await {
            Ok(Some(internal_positions)) => {
                let position = Position {
                    id: Uuid::new_v4().to_string(),
                    status: PositionStatus::Opened,
                    internal_positions,
                };
                info!(
                    receipt = %receipt_id,
                    position = %position.id,
                    description = %opportunity.description,
                    "Opportunity executed"
                );
                Receipt {
                    id: receipt_id,
                    status: ReceiptStatus::Success,
                    positions: vec![position],
                    description: opportunity.description.clone(),
                    created_at: Utc::now(),
                }
            }
            Ok(None) => {
                // A leg resolved but did not fill. Already-filled legs are
                // not unwound; the failed receipt records the attempt.
                Receipt {
                    id: receipt_id,
                    status: ReceiptStatus::Failed,
                    positions: Vec::new(),
                    description: opportunity.description.clone(),
                    created_at: Utc::now(),
                }
            }
            Err(err) => {
                error!(
                    receipt = %receipt_id,
                    description = %opportunity.description,
                    error = %err,
                    "Opportunity execution failed"
                );
                Receipt {
                    id: receipt_id,
                    status: ReceiptStatus::Failed,
                    positions: Vec::new(),
                    description: opportunity.description.clone(),
                    created_at: Utc::now(),
                }
            }
        };

        self.ledger.record(receipt.clone()).await;
        receipt
    }

    /// Execute legs strictly in order. `Ok(Some(_))` only when every leg
    /// filled; the first non-filled leg stops the sequence.
    async fn run_legs(
        &self,
        opportunity: &Opportunity,
    ) -> Result<Option<Vec<InternalPosition>>, ExecutionError> {
        let mut internal_positions = Vec::with_capacity(opportunity.legs.len());

        for leg in &opportunity.legs {
            let execution = self.coordinator.execute_leg(leg).await?;
            if !execution.is_filled() {
                warn!(
                    venue = %leg.venue,
                    instrument = %leg.request.instrument,
                    outcome = %execution.outcome,
                    filled_legs = internal_positions.len(),
                    "Leg did not fill, abandoning remaining legs"
                );
                return Ok(None);
            }
            internal_positions.push(InternalPosition {
                id: execution.handle.id.clone(),
                venue: leg.venue.clone(),
                status: PositionStatus::Opened,
                instrument: leg.request.instrument.clone(),
            });
        }

        Ok(Some(internal_positions))
    }

    /// Persist the current ledger contents. Save failures are logged; the
    /// in-memory ledger stays authoritative until the next successful save.
    pub async fn flush(&self) {
        let snapshot = self.ledger.snapshot().await;
        if let Err(err) = self.store.save(&snapshot).await {
            error!(error = %err, "Snapshot save failed, in-memory state remains authoritative");
        }
    }

    /// Drive `process()` on the configured cadence until `shutdown` is
    /// notified, then flush a final snapshot. The in-flight cycle always
    /// completes before the final flush; a snapshot never races a mutation.
    pub async fn run_until_shutdown(&self, shutdown: Arc<Notify>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.cycle_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(cycle_secs = self.cycle_secs, "Strategy loop started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let receipts = self.process().await;
                    if !receipts.is_empty() {
                        info!(receipts = receipts.len(), "Cycle recorded receipts");
                    }
                }
                _ = shutdown.notified() => {
                    info!("Shutdown requested, stopping strategy loop");
                    break;
                }
            }
        }

        self.flush().await;
        info!("Final snapshot flushed");
    }

    // Read-only query surface.

    pub async fn position(&self, id: &str) -> Option<Position> {
        self.ledger.position(id).await
    }

    pub async fn positions(&self) -> Vec<Position> {
        self.ledger.positions().await
    }

    pub async fn receipt(&self, id: &str) -> Option<Receipt> {
        self.ledger.receipt(id).await
    }

    pub async fn receipts(&self) -> Vec<Receipt> {
        self.ledger.receipts().await
    }
}
