//! # Stripe Checkout Sessions
//!
//! `PaymentProcessor` backed by the Stripe Checkout Sessions API.
//! Customers pay on Stripe's hosted page; this adapter only creates and
//! reads sessions.

use crate::config::StripeConfig;
use async_trait::async_trait;
use checkout_core::{
    CheckoutAttempt, CheckoutError, CheckoutResult, CheckoutUrls, Currency, Money,
    PaymentProcessor, PaymentStatus, SessionRef, SessionStatus, ORDER_REFERENCE_KEY,
};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe Checkout Session processor
///
/// Uses Stripe's hosted checkout page, so no card data ever reaches us.
pub struct StripeProcessor {
    config: StripeConfig,
    client: Client,
}

impl StripeProcessor {
    /// Create a new Stripe processor
    pub fn new(config: StripeConfig) -> CheckoutResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                CheckoutError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Form body for `POST /v1/checkout/sessions`
    fn session_form(&self, attempt: &CheckoutAttempt, urls: &CheckoutUrls) -> Vec<(String, String)> {
        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("submit_type".to_string(), "pay".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("billing_address_collection".to_string(), "auto".to_string()),
            ("invoice_creation[enabled]".to_string(), "true".to_string()),
            ("phone_number_collection[enabled]".to_string(), "true".to_string()),
            ("success_url".to_string(), urls.success_url()),
            ("cancel_url".to_string(), urls.cancel_url()),
            (
                format!("metadata[{}]", ORDER_REFERENCE_KEY),
                attempt.order_reference().to_string(),
            ),
        ];

        for (i, rate) in self.config.shipping_rate_ids.iter().enumerate() {
            form_params.push((format!("shipping_options[{}][shipping_rate]", i), rate.clone()));
        }

        let currency = self.config.currency.as_str();
        for (i, line) in attempt.lines.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            form_params.extend([
                (
                    format!("{}[price_data][currency]", prefix),
                    currency.to_string(),
                ),
                (
                    format!("{}[price_data][unit_amount]", prefix),
                    line.unit_price_minor_units.to_string(),
                ),
                (
                    format!("{}[price_data][product_data][name]", prefix),
                    line.name.clone(),
                ),
                (
                    format!("{}[price_data][product_data][metadata][product_id]", prefix),
                    line.product_id.clone(),
                ),
                (format!("{}[quantity]", prefix), line.quantity.to_string()),
                (
                    format!("{}[adjustable_quantity][enabled]", prefix),
                    "true".to_string(),
                ),
                (
                    format!("{}[adjustable_quantity][minimum]", prefix),
                    "1".to_string(),
                ),
                (
                    format!("{}[adjustable_quantity][maximum]", prefix),
                    self.config.max_adjustable_quantity.to_string(),
                ),
            ]);
        }

        form_params
    }

    /// Turn a Stripe HTTP response into a body or a typed upstream error.
    async fn read_body(response: Response) -> CheckoutResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::UpstreamUnavailable(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        error!("Stripe API error: status={}, body={}", status, body);

        let message = serde_json::from_str::<StripeErrorResponse>(&body)
            .map(|r| r.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        // 429 and 5xx are outages; other 4xx are Stripe refusing the request.
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(CheckoutError::UpstreamUnavailable(message))
        } else {
            Err(CheckoutError::UpstreamRejected { message })
        }
    }
}

/// Map Stripe's session `status` + `payment_status` pair onto ours.
///
/// An open session is still on the hosted page; once complete or expired,
/// `payment_status` is final. Unrecognised values stay `Unknown`.
pub fn map_payment_status(session_status: Option<&str>, payment_status: &str) -> PaymentStatus {
    match (session_status, payment_status) {
        (_, "paid") => PaymentStatus::Paid,
        (Some("open"), "unpaid") => PaymentStatus::Pending,
        (_, "unpaid") => PaymentStatus::Unpaid,
        (_, other) => PaymentStatus::Unknown(other.to_string()),
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    #[instrument(skip(self, attempt, urls), fields(key = %attempt.idempotency_key))]
    async fn create_checkout_session(
        &self,
        attempt: &CheckoutAttempt,
        urls: &CheckoutUrls,
    ) -> CheckoutResult<SessionRef> {
        let form_params = self.session_form(attempt, urls);

        debug!(
            "Creating Stripe checkout session: {} lines, {} params",
            attempt.lines.len(),
            form_params.len()
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", attempt.idempotency_key.as_str())
            .form(&form_params)
            .send()
            .await
            .map_err(|e| CheckoutError::UpstreamUnavailable(e.to_string()))?;

        let body = Self::read_body(response).await?;

        let session: StripeCheckoutSession = serde_json::from_str(&body).map_err(|e| {
            CheckoutError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        info!(
            "Created Stripe checkout session: id={}, url={:?}",
            session.id, session.url
        );

        Ok(SessionRef::new(session.id, session.url))
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> CheckoutResult<SessionStatus> {
        if session_id.is_empty() || !session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CheckoutError::UpstreamRejected {
                message: format!("Invalid checkout session id: {}", session_id),
            });
        }

        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, session_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| CheckoutError::UpstreamUnavailable(e.to_string()))?;

        let body = Self::read_body(response).await?;

        let session: StripeCheckoutSession = serde_json::from_str(&body).map_err(|e| {
            CheckoutError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        let payment_status = map_payment_status(
            session.status.as_deref(),
            session.payment_status.as_deref().unwrap_or("unknown"),
        );

        debug!(
            "Retrieved Stripe checkout session: id={}, payment_status={}",
            session.id, payment_status
        );

        let amount_total = match (session.amount_total, session.currency.as_deref()) {
            (Some(amount), Some(code)) => code
                .parse::<Currency>()
                .ok()
                .map(|currency| Money::new(amount, currency)),
            _ => None,
        };

        Ok(SessionStatus {
            session_id: session.id,
            payment_status,
            amount_total,
            metadata: session.metadata,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
