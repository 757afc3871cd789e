//! # Payment Processor Trait
//!
//! The external collaborator. The core depends on exactly two processor
//! operations, creating a hosted checkout session and retrieving one.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentProcessor (trait)                   │
//! │  ├── create_checkout_session()                              │
//! │  ├── retrieve_session()                                     │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │StripeProcessor│
//!                    └───────────────┘
//! ```

use crate::cart::CheckoutAttempt;
use crate::error::CheckoutResult;
use crate::session::{SessionRef, SessionStatus};
use async_trait::async_trait;
use std::sync::Arc;

/// Core trait for payment processor adapters.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a hosted checkout session for the attempt.
    ///
    /// Implementations must forward `attempt.idempotency_key` so that a
    /// repeated call for the same attempt returns the same session.
    async fn create_checkout_session(
        &self,
        attempt: &CheckoutAttempt,
        urls: &CheckoutUrls,
    ) -> CheckoutResult<SessionRef>;

    /// Fetch the current state of a session.
    async fn retrieve_session(&self, session_id: &str) -> CheckoutResult<SessionStatus>;

    /// Get the provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared processor (dynamic dispatch)
pub type BoxedPaymentProcessor = Arc<dyn PaymentProcessor>;

/// Placeholder the processor substitutes with the real session id on redirect
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Return URLs handed to the processor
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the storefront (e.g., "https://shop.example.com")
    pub base_url: String,
    /// Success page path
    pub success_path: String,
    /// Cancel page path
    pub cancel_path: String,
}

impl CheckoutUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            success_path: "/payment-success".to_string(),
            cancel_path: "/payment-cancel".to_string(),
        }
    }

    /// Success URL including the session id placeholder
    pub fn success_url(&self) -> String {
        format!(
            "{}{}?session_id={}",
            self.base_url, self.success_path, SESSION_ID_PLACEHOLDER
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}{}", self.base_url, self.cancel_path)
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_urls() {
        let urls = CheckoutUrls::new("https://shop.example.com/");

        assert_eq!(
            urls.success_url(),
            "https://shop.example.com/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(urls.cancel_url(), "https://shop.example.com/payment-cancel");
    }
}
