//! # Session Creation Gateway
//!
//! Validates a submitted cart and asks the processor for a hosted checkout
//! session. Deduplication of retried submits is delegated to the processor
//! through the attempt's idempotency key; the gateway keeps no state of its
//! own.

use crate::cart::{CartLimits, CartLine, CheckoutAttempt};
use crate::error::{CheckoutError, CheckoutResult};
use crate::idempotency::IdempotencyKey;
use crate::processor::{BoxedPaymentProcessor, CheckoutUrls};
use crate::session::SessionRef;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Default bound on any single processor call
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

/// Run a processor call under a deadline; expiry is reported as unavailable.
pub(crate) async fn with_upstream_timeout<T, F>(
    timeout: Duration,
    operation: &str,
    fut: F,
) -> CheckoutResult<T>
where
    F: Future<Output = CheckoutResult<T>>,
{
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        CheckoutError::UpstreamUnavailable(format!(
            "{} timed out after {}s",
            operation,
            timeout.as_secs()
        ))
    })?
}

/// Server-side entry point for starting a checkout
#[derive(Clone)]
pub struct SessionGateway {
    processor: BoxedPaymentProcessor,
    urls: CheckoutUrls,
    limits: CartLimits,
    timeout: Duration,
}

impl SessionGateway {
    pub fn new(processor: BoxedPaymentProcessor, urls: CheckoutUrls) -> Self {
        Self {
            processor,
            urls,
            limits: CartLimits::default(),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Builder: set cart limits
    pub fn with_limits(mut self, limits: CartLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Builder: set processor call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn urls(&self) -> &CheckoutUrls {
        &self.urls
    }

    pub fn limits(&self) -> CartLimits {
        self.limits
    }

    /// Validate the cart and create (or re-fetch, for a retried key) the
    /// processor session.
    ///
    /// Invalid carts are rejected before the processor is contacted.
    #[instrument(skip(self, lines, key), fields(key = %key, lines = lines.len()))]
    pub async fn create_session(
        &self,
        lines: Vec<CartLine>,
        key: IdempotencyKey,
    ) -> CheckoutResult<SessionRef> {
        self.limits.validate(&lines)?;

        let attempt = CheckoutAttempt::new(key, lines);
        info!(
            provider = self.processor.provider_name(),
            total_minor_units = attempt.total_minor_units(),
            "Creating checkout session"
        );

        let session = with_upstream_timeout(
            self.timeout,
            "create checkout session",
            self.processor.create_checkout_session(&attempt, &self.urls),
        )
        .await
        .map_err(|e| {
            error!("Failed to create checkout session: {}", e);
            e
        })?;

        info!(session_id = %session.session_id, "Created checkout session");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::PaymentProcessor;
    use crate::session::{PaymentStatus, SessionStatus};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Processor double that honours idempotency keys like the real one.
    #[derive(Default)]
    struct KeyedProcessor {
        sessions: Mutex<HashMap<String, SessionRef>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PaymentProcessor for KeyedProcessor {
        async fn create_checkout_session(
            &self,
            attempt: &CheckoutAttempt,
            _urls: &CheckoutUrls,
        ) -> CheckoutResult<SessionRef> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut sessions = self.sessions.lock().unwrap();
            let next = sessions.len() + 1;
            Ok(sessions
                .entry(attempt.idempotency_key.to_string())
                .or_insert_with(|| SessionRef::new(format!("cs_test_{}", next), None))
                .clone())
        }

        async fn retrieve_session(&self, session_id: &str) -> CheckoutResult<SessionStatus> {
            Ok(SessionStatus::new(session_id, PaymentStatus::Pending))
        }

        fn provider_name(&self) -> &'static str {
            "keyed"
        }
    }

    struct HangingProcessor;

    #[async_trait]
    impl PaymentProcessor for HangingProcessor {
        async fn create_checkout_session(
            &self,
            _attempt: &CheckoutAttempt,
            _urls: &CheckoutUrls,
        ) -> CheckoutResult<SessionRef> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(SessionRef::new("never", None))
        }

        async fn retrieve_session(&self, session_id: &str) -> CheckoutResult<SessionStatus> {
            Ok(SessionStatus::new(session_id, PaymentStatus::Pending))
        }

        fn provider_name(&self) -> &'static str {
            "hanging"
        }
    }

    fn sample_cart() -> Vec<CartLine> {
        vec![
            CartLine::new("1", "Shoes", 2000, 2),
            CartLine::new("2", "Shirts", 1000, 3),
            CartLine::new("3", "Jeans", 6000, 3),
        ]
    }

    fn gateway(processor: Arc<KeyedProcessor>) -> SessionGateway {
        SessionGateway::new(processor, CheckoutUrls::default())
    }

    #[tokio::test]
    async fn test_same_key_same_session() {
        let processor = Arc::new(KeyedProcessor::default());
        let gateway = gateway(processor.clone());
        let key = IdempotencyKey::new();

        let first = gateway.create_session(sample_cart(), key.clone()).await.unwrap();
        let second = gateway.create_session(sample_cart(), key).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_different_keys_different_sessions() {
        let processor = Arc::new(KeyedProcessor::default());
        let gateway = gateway(processor.clone());

        let first = gateway
            .create_session(sample_cart(), IdempotencyKey::new())
            .await
            .unwrap();
        let second = gateway
            .create_session(sample_cart(), IdempotencyKey::new())
            .await
            .unwrap();

        assert_ne!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn test_empty_cart_never_reaches_processor() {
        let processor = Arc::new(KeyedProcessor::default());
        let gateway = gateway(processor.clone());

        let result = gateway.create_session(Vec::new(), IdempotencyKey::new()).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_line_never_reaches_processor() {
        let processor = Arc::new(KeyedProcessor::default());
        let gateway = gateway(processor.clone()).with_limits(CartLimits { max_quantity: 2 });

        let result = gateway
            .create_session(sample_cart(), IdempotencyKey::new())
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::InvalidLine { index: 1, .. })
        ));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_upstream_unavailable() {
        let gateway = SessionGateway::new(Arc::new(HangingProcessor), CheckoutUrls::default())
            .with_timeout(Duration::from_secs(5));

        let result = gateway
            .create_session(sample_cart(), IdempotencyKey::new())
            .await;

        assert!(matches!(result, Err(CheckoutError::UpstreamUnavailable(_))));
    }
}
