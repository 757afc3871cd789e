//! # Fulfillment Ledger
//!
//! The exactly-once boundary between a confirmed payment and business state.
//!
//! Per session id the ledger moves through:
//!
//! ```text
//! Unknown ──observe(paid)──▶ Fulfilled (terminal, record written once)
//!    │
//!    └──observe(other)──▶ no record, NotPaid reported
//! ```
//!
//! The session id is the fulfillment idempotency key. A claim is an atomic
//! check-and-set on that key; whichever caller wins runs the business side
//! effects, every other caller (second tab, refresh, webhook replay, restart)
//! gets `AlreadyFulfilled`.

use crate::error::CheckoutResult;
use crate::session::{PaymentStatus, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Durable proof that a session has been fulfilled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentRecord {
    pub session_id: String,
    pub business_order_id: String,
    pub fulfilled_at: DateTime<Utc>,
}

impl FulfillmentRecord {
    /// Record for a paid observation, stamped now
    pub fn for_session(session: &SessionStatus) -> Self {
        Self {
            session_id: session.session_id.clone(),
            business_order_id: session.business_order_id().to_string(),
            fulfilled_at: Utc::now(),
        }
    }
}

/// What a claim did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FulfillmentOutcome {
    /// This call won the claim and ran the side effects
    NewlyFulfilled { record: FulfillmentRecord },
    /// Another call already fulfilled the session; nothing ran
    AlreadyFulfilled { record: FulfillmentRecord },
    /// Observation was not `paid`; nothing was written
    NotPaid { status: PaymentStatus },
}

impl FulfillmentOutcome {
    pub fn record(&self) -> Option<&FulfillmentRecord> {
        match self {
            FulfillmentOutcome::NewlyFulfilled { record }
            | FulfillmentOutcome::AlreadyFulfilled { record } => Some(record),
            FulfillmentOutcome::NotPaid { .. } => None,
        }
    }

    pub fn is_newly_fulfilled(&self) -> bool {
        matches!(self, FulfillmentOutcome::NewlyFulfilled { .. })
    }
}

/// Persistent store of fulfillment records.
///
/// `observed` must come from a fresh `retrieve_session` call, never from
/// anything the client sent.
#[async_trait]
pub trait FulfillmentLedger: Send + Sync {
    /// Atomically claim the session and, if this call wins, run fulfillment.
    ///
    /// Errors mean nothing can be assumed about fulfillment.
    async fn claim_and_fulfill(&self, observed: &SessionStatus)
        -> CheckoutResult<FulfillmentOutcome>;

    /// Look up the record for a session, if it was ever fulfilled.
    async fn get(&self, session_id: &str) -> CheckoutResult<Option<FulfillmentRecord>>;

    /// Fails when the backing store cannot be reached.
    async fn health_check(&self) -> CheckoutResult<()>;
}

/// Type alias for a shared ledger
pub type BoxedFulfillmentLedger = Arc<dyn FulfillmentLedger>;

/// Business side effects of a confirmed payment (mark paid, send mail, ship).
///
/// Runs only inside a winning claim. Returning an error rolls the claim back
/// so a later observation can try again.
#[async_trait]
pub trait Fulfiller: Send + Sync {
    async fn fulfill(&self, record: &FulfillmentRecord, session: &SessionStatus)
        -> CheckoutResult<()>;
}

/// Default fulfiller: logs the order transition
pub struct LoggingFulfiller;

#[async_trait]
impl Fulfiller for LoggingFulfiller {
    async fn fulfill(
        &self,
        record: &FulfillmentRecord,
        session: &SessionStatus,
    ) -> CheckoutResult<()> {
        info!(
            session_id = %record.session_id,
            order_id = %record.business_order_id,
            amount = %session
                .amount_total
                .map(|m| m.display())
                .unwrap_or_else(|| "N/A".to_string()),
            "Order marked as PAID and FULFILLED"
        );
        Ok(())
    }
}
