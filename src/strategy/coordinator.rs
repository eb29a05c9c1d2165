//! Order execution coordination.
//!
//! Drives one logical order through create → poll → (cancel → recheck) →
//! terminal outcome, with bounded retry budgets at each stage. No ledger
//! mutation happens here; outcomes are returned to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ExecutionConfig;
use crate::error::{ExecutionError, RetryStage};
use crate::strategy::types::Leg;
use crate::utils::retry::{retry_bounded, RetryError, RetryPolicy};
use crate::venue::{OrderHandle, OrderOutcome, VenueAdapter};

/// The resolved order of one executed leg.
#[derive(Debug, Clone)]
pub struct LegExecution {
    pub handle: OrderHandle,
    pub outcome: OrderOutcome,
}

impl LegExecution {
    /// Only a filled leg counts as success for receipt purposes.
    pub fn is_filled(&self) -> bool {
        matches!(self.outcome, OrderOutcome::Filled(_))
    }
}

/// Executes single legs against a map of venue adapters.
pub struct ExecutionCoordinator {
    venues: HashMap<String, Arc<dyn VenueAdapter>>,
    create_policy: RetryPolicy,
    poll_policy: RetryPolicy,
}

impl ExecutionCoordinator {
    pub fn new(venues: Vec<Arc<dyn VenueAdapter>>, config: &ExecutionConfig) -> Self {
        let venues = venues
            .into_iter()
            .map(|v| (v.name().to_string(), v))
            .collect();
        Self {
            venues,
            // Creation retries immediately; polling waits the fixed delay
            // between failed attempts.
            create_policy: RetryPolicy::immediate(config.create_attempts),
            poll_policy: RetryPolicy::new(
                config.poll_attempts,
                Duration::from_millis(config.poll_delay_ms),
            ),
        }
    }

    fn venue(&self, name: &str) -> Result<&Arc<dyn VenueAdapter>, ExecutionError> {
        self.venues
            .get(name)
            .ok_or_else(|| ExecutionError::UnknownVenue(name.to_string()))
    }

    fn escalate(stage: RetryStage, venue: &str, err: RetryError) -> ExecutionError {
        if err.last.is_retryable() {
            ExecutionError::ExhaustedRetries {
                stage,
                venue: venue.to_string(),
                attempts: err.attempts,
                last: err.last,
            }
        } else {
            // Non-retryable errors cut the stage short; surface them as-is.
            ExecutionError::Venue(err.last)
        }
    }

    /// Drive one leg to a terminal-or-reportable outcome.
    pub async fn execute_leg(&self, leg: &Leg) -> Result<LegExecution, ExecutionError> {
        let venue = self.venue(&leg.venue)?;

        let handle = retry_bounded(self.create_policy, || venue.create_order(&leg.request))
            .await
            .map_err(|err| {
                warn!(
                    venue = %leg.venue,
                    instrument = %leg.request.instrument,
                    attempts = err.attempts,
                    error = %err.last,
                    "Order creation failed"
                );
                Self::escalate(RetryStage::Create, venue.name(), err)
            })?;

        debug!(venue = %leg.venue, order = %handle.id, "Order created, resolving");
        let outcome = self.resolve(venue, &handle).await?;

        info!(
            venue = %leg.venue,
            order = %handle.id,
            instrument = %handle.instrument,
            outcome = %outcome,
            "Leg resolved"
        );
        Ok(LegExecution { handle, outcome })
    }

    /// Poll for the order result; on exhaustion, cancel and recheck with
    /// the same budget. Venues whose orders settle irrevocably skip the
    /// cancel phase and the first exhaustion is final.
    async fn resolve(
        &self,
        venue: &Arc<dyn VenueAdapter>,
        handle: &OrderHandle,
    ) -> Result<OrderOutcome, ExecutionError> {
        let first = retry_bounded(self.poll_policy, || venue.get_order_result(handle)).await;

        let first_err = match first {
            Ok(outcome) => return Ok(outcome),
            Err(err) if !err.last.is_retryable() => {
                return Err(ExecutionError::Venue(err.last));
            }
            Err(err) => err,
        };

        if !venue.supports_cancel() {
            warn!(
                venue = %venue.name(),
                order = %handle.id,
                attempts = first_err.attempts,
                "Polling exhausted on a non-cancellable venue"
            );
            return Err(Self::escalate(RetryStage::Resolve, venue.name(), first_err));
        }

        warn!(
            venue = %venue.name(),
            order = %handle.id,
            attempts = first_err.attempts,
            "Polling exhausted, cancelling and rechecking"
        );

        // Each recheck attempt is cancel-then-poll; cancel is idempotent.
        retry_bounded(self.poll_policy, || async move {
            venue.cancel_order(handle).await?;
            venue.get_order_result(handle).await
        })
        .await
        .map_err(|err| Self::escalate(RetryStage::Resolve, venue.name(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VenueError;
    use crate::venue::types::{Fill, OrderDetail, Side};
    use crate::venue::{MockVenue, MockVenueAdapter, OrderRequest};
    use rust_decimal_macros::dec;

    fn leg_for(venue: &str) -> Leg {
        Leg {
            venue: venue.to_string(),
            request: OrderRequest {
                instrument: "BTC".to_string(),
                side: Side::Buy,
                amount_in: dec!(100),
                detail: OrderDetail::BookLimit {
                    price: dec!(100),
                    base_amount: dec!(1),
                },
            },
        }
    }

    fn coordinator_with(venue: Arc<dyn VenueAdapter>) -> ExecutionCoordinator {
        ExecutionCoordinator::new(vec![venue], &ExecutionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn create_failure_makes_exactly_three_attempts() {
        let venue = Arc::new(MockVenue::new("mock"));
        venue.fail_creates(u32::MAX).await;
        let coordinator = coordinator_with(venue.clone());

        let err = coordinator.execute_leg(&leg_for("mock")).await.unwrap_err();

        assert_eq!(venue.create_calls(), 3);
        assert_eq!(venue.poll_calls(), 0);
        assert!(matches!(
            err,
            ExecutionError::ExhaustedRetries {
                stage: RetryStage::Create,
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_fallback_recovers_a_fill() {
        let venue = Arc::new(MockVenue::new("mock"));
        venue.fail_polls(3).await;
        venue
            .script_outcomes(vec![OrderOutcome::Filled(Fill {
                instrument: "BTC".to_string(),
                amount_out: dec!(1),
            })])
            .await;
        let coordinator = coordinator_with(venue.clone());

        let execution = coordinator.execute_leg(&leg_for("mock")).await.unwrap();

        // 3 failed polls, then 1 cancel + 1 successful poll.
        assert!(execution.is_filled());
        assert_eq!(venue.poll_calls(), 4);
        assert_eq!(venue.cancel_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_cancellable_venue_skips_the_cancel_phase() {
        let venue = Arc::new(MockVenue::non_cancellable("mock"));
        venue.fail_polls(u32::MAX).await;
        let coordinator = coordinator_with(venue.clone());

        let err = coordinator.execute_leg(&leg_for("mock")).await.unwrap_err();

        assert_eq!(venue.poll_calls(), 3);
        assert_eq!(venue.cancel_calls(), 0);
        assert!(matches!(
            err,
            ExecutionError::ExhaustedRetries {
                stage: RetryStage::Resolve,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_both_phases_is_fatal() {
        let venue = Arc::new(MockVenue::new("mock"));
        venue.fail_polls(3).await;
        venue.fail_cancels(u32::MAX).await;
        let coordinator = coordinator_with(venue.clone());

        let err = coordinator.execute_leg(&leg_for("mock")).await.unwrap_err();

        // First phase: 3 polls. Second phase: 3 cancel attempts, none of
        // which reach the recheck poll.
        assert_eq!(venue.poll_calls(), 3);
        assert_eq!(venue.cancel_calls(), 3);
        assert!(matches!(
            err,
            ExecutionError::ExhaustedRetries {
                stage: RetryStage::Resolve,
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn non_terminal_outcome_is_returned_not_retried() {
        let venue = Arc::new(MockVenue::new("mock"));
        venue.script_outcomes(vec![OrderOutcome::Pending]).await;
        let coordinator = coordinator_with(venue.clone());

        let execution = coordinator.execute_leg(&leg_for("mock")).await.unwrap();

        assert_eq!(execution.outcome, OrderOutcome::Pending);
        assert!(!execution.is_filled());
        assert_eq!(venue.poll_calls(), 1);
        assert_eq!(venue.cancel_calls(), 0);
    }

    #[tokio::test]
    async fn validation_error_on_create_is_not_retried() {
        let mut venue = MockVenueAdapter::new();
        venue.expect_name().return_const("mock".to_string());
        venue
            .expect_create_order()
            .times(1)
            .returning(|_| Err(VenueError::validation("mock", "rejected shape")));
        let coordinator = coordinator_with(Arc::new(venue));

        let err = coordinator.execute_leg(&leg_for("mock")).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Venue(VenueError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_venue_is_rejected() {
        let coordinator = coordinator_with(Arc::new(MockVenue::new("mock")));
        let err = coordinator
            .execute_leg(&leg_for("elsewhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::UnknownVenue(_)));
    }
}
