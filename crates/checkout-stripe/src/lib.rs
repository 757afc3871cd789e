//! # checkout-stripe
//!
//! Stripe Checkout Sessions adapter for hosted-checkout-rs.
//!
//! `StripeProcessor` implements `checkout_core::PaymentProcessor`:
//! - creates hosted checkout sessions, forwarding the attempt's
//!   idempotency key as Stripe's `Idempotency-Key` header
//! - retrieves sessions so the success page can trust Stripe, not the URL
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_stripe::StripeProcessor;
//!
//! let processor = Arc::new(StripeProcessor::from_env()?);
//! let gateway = SessionGateway::new(processor, CheckoutUrls::new(base_url));
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! let event = construct_event(secret, &body, signature, Utc::now().timestamp())?;
//! if let (true, Some(session_id)) = (event.event_type.may_settle_payment(), event.session_id) {
//!     reconciler.reconcile(Some(&session_id)).await;
//! }
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::{map_payment_status, StripeProcessor};
pub use config::StripeConfig;
pub use webhook::{construct_event, WebhookEvent, WebhookEventType};
