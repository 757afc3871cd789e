//! # Checkout Error Types
//!
//! Typed error handling for the checkout flow.
//! All fallible operations return `Result<T, CheckoutError>`.

use thiserror::Error;

/// Coarse error classes, used to pick the user-facing treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any external call
    InputValidation,
    /// Payment processor unreachable or refused the request
    UpstreamFailure,
    /// Fulfillment storage unavailable, or the fulfillment side effect failed
    LedgerFailure,
    /// Missing or malformed configuration
    Configuration,
    /// Bug or unexpected data
    Internal,
}

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cart has no lines
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line failed validation
    #[error("Invalid cart line {index}: {reason}")]
    InvalidLine { index: usize, reason: String },

    /// Idempotency key header missing or not a valid key
    #[error("Invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    /// Network failure, timeout, or processor-side outage
    #[error("Payment processor unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Processor refused the request (message passed through)
    #[error("{message}")]
    UpstreamRejected { message: String },

    /// Fulfillment store could not be reached or written
    #[error("Fulfillment ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Business fulfillment side effect failed; the claim was rolled back
    #[error("Fulfillment failed for session {session_id}: {message}")]
    FulfillmentFailed { session_id: String, message: String },

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Error class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::EmptyCart
            | CheckoutError::InvalidLine { .. }
            | CheckoutError::InvalidIdempotencyKey(_)
            | CheckoutError::WebhookVerificationFailed(_)
            | CheckoutError::WebhookParseError(_) => ErrorKind::InputValidation,
            CheckoutError::UpstreamUnavailable(_) | CheckoutError::UpstreamRejected { .. } => {
                ErrorKind::UpstreamFailure
            }
            CheckoutError::LedgerUnavailable(_) | CheckoutError::FulfillmentFailed { .. } => {
                ErrorKind::LedgerFailure
            }
            CheckoutError::Configuration(_) => ErrorKind::Configuration,
            CheckoutError::Serialization(_) | CheckoutError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the user may safely retry the action that failed.
    ///
    /// Nothing in the core retries on its own; this only drives the retry
    /// affordance shown to the user.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::UpstreamUnavailable(_)
                | CheckoutError::UpstreamRejected { .. }
                | CheckoutError::LedgerUnavailable(_)
                | CheckoutError::FulfillmentFailed { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::Configuration(_) => 500,
            CheckoutError::EmptyCart => 400,
            CheckoutError::InvalidLine { .. } => 400,
            CheckoutError::InvalidIdempotencyKey(_) => 400,
            CheckoutError::UpstreamUnavailable(_) => 503,
            CheckoutError::UpstreamRejected { .. } => 502,
            CheckoutError::LedgerUnavailable(_) => 503,
            CheckoutError::FulfillmentFailed { .. } => 500,
            CheckoutError::WebhookVerificationFailed(_) => 401,
            CheckoutError::WebhookParseError(_) => 400,
            CheckoutError::Serialization(_) => 500,
            CheckoutError::Internal(_) => 500,
        }
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;
