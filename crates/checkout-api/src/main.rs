//! # Hosted Checkout
//!
//! Storefront and fulfillment server for Stripe hosted checkout.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export BASE_URL=http://localhost:8080
//!
//! # Run the server
//! hosted-checkout
//! ```

use checkout_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Cart lines loaded: {}", state.demo_cart.lines.len());
    info!("Fulfillment ledger: {}", state.config.ledger_path.display());
    if state.webhook_secret.is_none() {
        info!("STRIPE_WEBHOOK_SECRET not set, webhooks will be refused");
    }

    let app = routes::create_router(state);

    info!("🛒 Hosted Checkout starting on http://{}", addr);

    if !is_prod {
        info!("🏠 Storefront: http://{}/", addr);
        info!("💳 Session: POST http://{}/api/stripe-session", addr);
        info!("🔔 Webhook: POST http://{}/webhook/stripe", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  🛒 Hosted Checkout 🛒
  ━━━━━━━━━━━━━━━━━━━━━━━
  Pay once, fulfill once
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
