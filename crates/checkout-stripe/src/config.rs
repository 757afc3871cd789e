//! # Stripe Configuration
//!
//! Configuration management for the Stripe adapter.
//! All secrets are loaded from environment variables.

use checkout_core::{CheckoutError, Currency, DEFAULT_MAX_QUANTITY};
use std::env;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_API_VERSION: &str = "2024-06-20";

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// Webhook signing secret (whsec_...); webhooks are refused without it
    pub webhook_secret: Option<String>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    /// Settlement currency for every line
    pub currency: Currency,

    /// Shipping rates offered on the hosted page (shr_...)
    pub shipping_rate_ids: Vec<String>,

    /// Upper bound for the customer-adjustable line quantity
    pub max_adjustable_quantity: u32,

    /// HTTP timeout for a single Stripe request
    pub request_timeout: Duration,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    ///
    /// Optional:
    /// - `STRIPE_WEBHOOK_SECRET`
    /// - `STRIPE_CURRENCY` (default `pkr`)
    /// - `STRIPE_SHIPPING_RATE_ID1`, `STRIPE_SHIPPING_RATE_ID2`
    pub fn from_env() -> Result<Self, CheckoutError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CheckoutError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("STRIPE_SECRET_KEY").ok_or_else(|| {
            CheckoutError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        if !secret_key.starts_with("sk_test_") && !secret_key.starts_with("sk_live_") {
            return Err(CheckoutError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        let webhook_secret = lookup("STRIPE_WEBHOOK_SECRET").filter(|s| !s.is_empty());
        if let Some(ref secret) = webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(CheckoutError::Configuration(
                    "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
                ));
            }
        }

        let currency = match lookup("STRIPE_CURRENCY") {
            Some(raw) => raw.parse().map_err(CheckoutError::Configuration)?,
            None => Currency::default(),
        };

        let shipping_rate_ids = ["STRIPE_SHIPPING_RATE_ID1", "STRIPE_SHIPPING_RATE_ID2"]
            .iter()
            .filter_map(|name| lookup(*name))
            .filter(|id| !id.trim().is_empty())
            .collect();

        Ok(Self {
            shipping_rate_ids,
            currency,
            webhook_secret,
            ..Self::new(secret_key)
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            currency: Currency::default(),
            shipping_rate_ids: Vec::new(),
            max_adjustable_quantity: DEFAULT_MAX_QUANTITY,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set webhook signing secret
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Builder: set settlement currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Builder: add a shipping rate
    pub fn with_shipping_rate(mut self, rate_id: impl Into<String>) -> Self {
        self.shipping_rate_ids.push(rate_id.into());
        self
    }

    /// Builder: set the adjustable quantity ceiling
    pub fn with_max_adjustable_quantity(mut self, max: u32) -> Self {
        self.max_adjustable_quantity = max;
        self
    }

    /// Builder: set the per-request HTTP timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_auth_header() {
        let config = StripeConfig::new("sk_test_abc123");
        assert_eq!(config.auth_header(), "Bearer sk_test_abc123");
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let result = StripeConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(CheckoutError::Configuration(_))));
    }

    #[test]
    fn test_from_lookup_rejects_publishable_key() {
        let result = StripeConfig::from_lookup(lookup_from(&[("STRIPE_SECRET_KEY", "pk_test_x")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_lookup_full() {
        let config = StripeConfig::from_lookup(lookup_from(&[
            ("STRIPE_SECRET_KEY", "sk_test_abc"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_123"),
            ("STRIPE_CURRENCY", "USD"),
            ("STRIPE_SHIPPING_RATE_ID1", "shr_1"),
            ("STRIPE_SHIPPING_RATE_ID2", ""),
        ]))
        .unwrap();

        assert_eq!(config.webhook_secret.as_deref(), Some("whsec_123"));
        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.shipping_rate_ids, vec!["shr_1".to_string()]);
        assert_eq!(config.api_base_url, "https://api.stripe.com");
    }

    #[test]
    fn test_from_lookup_bad_webhook_secret() {
        let result = StripeConfig::from_lookup(lookup_from(&[
            ("STRIPE_SECRET_KEY", "sk_test_abc"),
            ("STRIPE_WEBHOOK_SECRET", "secret"),
        ]));
        assert!(result.is_err());
    }
}
