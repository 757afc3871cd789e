//! # Session Types
//!
//! Cached views of processor-owned checkout sessions.

use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key under which the gateway stores the business order reference
pub const ORDER_REFERENCE_KEY: &str = "order_id";

/// Payment status of a processor session, as last observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "raw", rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Customer has not finished the hosted page yet
    Pending,
    /// Funds confirmed by the processor
    Paid,
    /// Session finished without a confirmed payment
    Unpaid,
    /// Anything the processor reports that we do not recognise
    Unknown(String),
}

impl PaymentStatus {
    /// Parse a status label. Unrecognised labels become `Unknown`, never `Paid`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "paid" => PaymentStatus::Paid,
            "unpaid" => PaymentStatus::Unpaid,
            "pending" => PaymentStatus::Pending,
            other => PaymentStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Unknown(raw) => raw,
        }
    }

    /// Final statuses are the ones the reconciler hands to the ledger.
    pub fn is_final(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Unpaid)
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a freshly created session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRef {
    /// Processor's session ID
    pub session_id: String,

    /// Hosted page the customer is redirected to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,

    /// Status at creation time (normally `Pending`)
    pub status: PaymentStatus,
}

impl SessionRef {
    pub fn new(session_id: impl Into<String>, checkout_url: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            checkout_url,
            status: PaymentStatus::Pending,
        }
    }
}

/// Result of a `RetrieveSession` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub payment_status: PaymentStatus,

    /// Total charged, when the processor reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_total: Option<Money>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl SessionStatus {
    pub fn new(session_id: impl Into<String>, payment_status: PaymentStatus) -> Self {
        Self {
            session_id: session_id.into(),
            payment_status,
            amount_total: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount_total = Some(amount);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Business order id: the gateway's order reference, else the session id.
    pub fn business_order_id(&self) -> &str {
        self.metadata
            .get(ORDER_REFERENCE_KEY)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.session_id)
    }
}
