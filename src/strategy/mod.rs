//! Strategy execution engine.
//!
//! Contains the core logic for:
//! - Cross-venue opportunity scanning
//! - Order execution with bounded retries and cancel-and-recheck
//! - The position/receipt ledger and its durable snapshots
//! - The per-tick cycle driver

mod coordinator;
mod ledger;
mod scanner;
mod service;
mod types;

pub use coordinator::{ExecutionCoordinator, LegExecution};
pub use ledger::{Ledger, LedgerSnapshot};
pub use scanner::{static_quote_table, OpportunityScanner};
pub use service::StrategyService;
pub use types::{Leg, Opportunity, OpportunityKind, Position, Receipt, ReceiptStatus};
