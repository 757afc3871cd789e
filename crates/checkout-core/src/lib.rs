//! # checkout-core
//!
//! Core types and traits for the hosted-checkout flow.
//!
//! This crate provides:
//! - `IdempotencyKey` for checkout attempts
//! - `CartLine`, `CartLimits` and `CheckoutAttempt` for the submitted cart
//! - `PaymentProcessor` trait for the external processor (create + retrieve)
//! - `FulfillmentLedger` and `Fulfiller` traits for exactly-once fulfillment
//! - `SessionGateway` and `Reconciler` (feature `runtime`)
//! - `CheckoutError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{CartLine, CheckoutUrls, IdempotencyKey, Reconciler, SessionGateway};
//!
//! let gateway = SessionGateway::new(processor.clone(), CheckoutUrls::new("https://shop.example.com"));
//! let session = gateway
//!     .create_session(vec![CartLine::new("1", "Shoes", 200_000, 2)], IdempotencyKey::new())
//!     .await?;
//!
//! // ...customer pays on the hosted page and comes back...
//!
//! let reconciler = Reconciler::new(processor, ledger);
//! let state = reconciler.reconcile(Some(&session.session_id)).await;
//! ```

pub mod cart;
pub mod error;
pub mod idempotency;
pub mod ledger;
pub mod money;
pub mod processor;
pub mod session;

#[cfg(feature = "runtime")]
pub mod gateway;
#[cfg(feature = "runtime")]
pub mod reconcile;

// Re-exports for convenience
pub use cart::{
    cart_total_minor_units, CartLimits, CartLine, CheckoutAttempt, DemoCart, DEFAULT_MAX_QUANTITY,
};
pub use error::{CheckoutError, CheckoutResult, ErrorKind};
pub use idempotency::{IdempotencyKey, IDEMPOTENCY_HEADER};
pub use ledger::{
    BoxedFulfillmentLedger, Fulfiller, FulfillmentLedger, FulfillmentOutcome, FulfillmentRecord,
    LoggingFulfiller,
};
pub use money::{Currency, Money};
pub use processor::{
    BoxedPaymentProcessor, CheckoutUrls, PaymentProcessor, SESSION_ID_PLACEHOLDER,
};
pub use session::{PaymentStatus, SessionRef, SessionStatus, ORDER_REFERENCE_KEY};

#[cfg(feature = "runtime")]
pub use gateway::{SessionGateway, DEFAULT_UPSTREAM_TIMEOUT};
#[cfg(feature = "runtime")]
pub use reconcile::{DisplayState, Reconciler};
