//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the session gateway, the reconciler and the storefront's demo cart.

use checkout_core::{
    BoxedFulfillmentLedger, BoxedPaymentProcessor, CartLimits, CheckoutUrls, Currency, DemoCart,
    LoggingFulfiller, Reconciler, SessionGateway, DEFAULT_MAX_QUANTITY, DEFAULT_UPSTREAM_TIMEOUT,
};
use checkout_ledger::SqliteLedger;
use checkout_stripe::StripeProcessor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for success/cancel redirects
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// SQLite file backing the fulfillment ledger
    pub ledger_path: PathBuf,
    /// Deadline for a single processor call
    pub upstream_timeout: Duration,
    /// Per-line quantity cap
    pub max_line_quantity: u32,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: lookup("BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            ledger_path: lookup("LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/fulfillment.db")),
            upstream_timeout: lookup("UPSTREAM_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT),
            max_line_quantity: lookup("MAX_LINE_QUANTITY")
                .and_then(|s| s.parse().ok())
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_MAX_QUANTITY),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Creates hosted checkout sessions
    pub gateway: SessionGateway,
    /// Observes sessions and claims fulfillment
    pub reconciler: Reconciler,
    /// Fulfillment ledger, probed by the health check
    pub ledger: BoxedFulfillmentLedger,
    /// Application config
    pub config: AppConfig,
    /// Cart shown on the storefront home page
    pub demo_cart: DemoCart,
    /// Currency the demo cart is priced in
    pub currency: Currency,
    /// Stripe webhook signing secret; the webhook route refuses events without it
    pub webhook_secret: Option<String>,
}

impl AppState {
    /// Wire up Stripe, the SQLite ledger and the demo cart from the environment.
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let stripe = StripeProcessor::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        let currency = stripe.config().currency;
        let webhook_secret = stripe.config().webhook_secret.clone();

        let ledger = SqliteLedger::open(&config.ledger_path, Arc::new(LoggingFulfiller))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open fulfillment ledger: {}", e))?;

        let demo_cart = load_demo_cart()?;

        Ok(Self::from_parts(
            config,
            Arc::new(stripe),
            Arc::new(ledger),
            demo_cart,
            currency,
            webhook_secret,
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: AppConfig,
        processor: BoxedPaymentProcessor,
        ledger: BoxedFulfillmentLedger,
        demo_cart: DemoCart,
        currency: Currency,
        webhook_secret: Option<String>,
    ) -> Self {
        let gateway = SessionGateway::new(processor.clone(), CheckoutUrls::new(&config.base_url))
            .with_limits(CartLimits {
                max_quantity: config.max_line_quantity,
            })
            .with_timeout(config.upstream_timeout);

        let reconciler =
            Reconciler::new(processor, ledger.clone()).with_timeout(config.upstream_timeout);

        Self {
            gateway,
            reconciler,
            ledger,
            config,
            demo_cart,
            currency,
            webhook_secret,
        }
    }
}

/// Load the demo cart from config file
fn load_demo_cart() -> anyhow::Result<DemoCart> {
    let config_paths = [
        "config/cart.toml",
        "../config/cart.toml",
        "../../config/cart.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let cart = DemoCart::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} cart lines from {}", cart.lines.len(), path);
            return Ok(cart);
        }
    }

    tracing::warn!("No cart config found, using built-in demo cart");
    Ok(DemoCart::default())
}
