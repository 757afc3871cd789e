//! # Status Reconciliation
//!
//! Runs when the customer comes back from the hosted page (or a webhook
//! replays the completion). Observes the processor's view of the session,
//! hands final observations to the ledger, and decides what the customer
//! sees. It never charges anything.

use crate::gateway::{with_upstream_timeout, DEFAULT_UPSTREAM_TIMEOUT};
use crate::ledger::{BoxedFulfillmentLedger, FulfillmentOutcome};
use crate::money::Money;
use crate::processor::BoxedPaymentProcessor;
use crate::session::PaymentStatus;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// What the result page renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayState {
    /// No session id on the return URL
    RedirectHome,
    /// Processor says paid but the ledger could not record the order yet
    Unrecorded { session_id: String },
    /// Paid and recorded
    Paid {
        session_id: String,
        business_order_id: String,
        amount: Option<Money>,
        newly_fulfilled: bool,
    },
    /// Hosted page not finished, or finished unpaid
    Pending {
        session_id: String,
        amount: Option<Money>,
    },
    /// Unrecognised status or the processor could not be asked
    Unknown { session_id: String, detail: String },
}

impl DisplayState {
    /// Whether the page offers "Try Payment Again"
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DisplayState::Unrecorded { .. }
                | DisplayState::Pending { .. }
                | DisplayState::Unknown { .. }
        )
    }
}

/// Observe-then-claim coordinator behind the success page and webhooks
#[derive(Clone)]
pub struct Reconciler {
    processor: BoxedPaymentProcessor,
    ledger: BoxedFulfillmentLedger,
    timeout: Duration,
}

impl Reconciler {
    pub fn new(processor: BoxedPaymentProcessor, ledger: BoxedFulfillmentLedger) -> Self {
        Self {
            processor,
            ledger,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Builder: set processor call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reconcile the session named on the return URL.
    ///
    /// A missing or blank id short-circuits to `RedirectHome` without
    /// touching the processor or the ledger.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, session_id: Option<&str>) -> DisplayState {
        let session_id = match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id,
            None => return DisplayState::RedirectHome,
        };

        let observed = match with_upstream_timeout(
            self.timeout,
            "retrieve checkout session",
            self.processor.retrieve_session(session_id),
        )
        .await
        {
            Ok(observed) => observed,
            Err(e) => {
                error!("Error retrieving checkout session {}: {}", session_id, e);
                return DisplayState::Unknown {
                    session_id: session_id.to_string(),
                    detail: e.to_string(),
                };
            }
        };

        let amount = observed.amount_total;

        match &observed.payment_status {
            PaymentStatus::Pending => {
                info!("Checkout session {} still open", session_id);
                return DisplayState::Pending {
                    session_id: session_id.to_string(),
                    amount,
                };
            }
            PaymentStatus::Unknown(raw) => {
                warn!(
                    "Checkout session {} has unknown payment status: {}",
                    session_id, raw
                );
                return DisplayState::Unknown {
                    session_id: session_id.to_string(),
                    detail: format!("unrecognised payment status '{}'", raw),
                };
            }
            PaymentStatus::Paid | PaymentStatus::Unpaid => {}
        }

        match self.ledger.claim_and_fulfill(&observed).await {
            Ok(FulfillmentOutcome::NewlyFulfilled { record }) => {
                info!(
                    "Order {} for session {} marked as fulfilled",
                    record.business_order_id, session_id
                );
                DisplayState::Paid {
                    session_id: session_id.to_string(),
                    business_order_id: record.business_order_id,
                    amount,
                    newly_fulfilled: true,
                }
            }
            Ok(FulfillmentOutcome::AlreadyFulfilled { record }) => {
                info!(
                    "Order {} for session {} was already processed",
                    record.business_order_id, session_id
                );
                DisplayState::Paid {
                    session_id: session_id.to_string(),
                    business_order_id: record.business_order_id,
                    amount,
                    newly_fulfilled: false,
                }
            }
            Ok(FulfillmentOutcome::NotPaid { status }) => {
                info!("Checkout session {} status: {}", session_id, status);
                DisplayState::Pending {
                    session_id: session_id.to_string(),
                    amount,
                }
            }
            Err(e) => {
                // Paid upstream but not recorded here: never claim success.
                error!("Fulfillment claim failed for session {}: {}", session_id, e);
                DisplayState::Unrecorded {
                    session_id: session_id.to_string(),
                }
            }
        }
    }
}
