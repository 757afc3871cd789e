//! # Routes
//!
//! Axum router configuration for the hosted checkout.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Storefront:
///   - GET  / - Demo cart with checkout button
///   - GET  /payment-success?session_id=... - Verifying interstitial
///   - GET  /payment-result?session_id=... - Reconcile and show the result
///   - GET  /payment-cancel - Cancel page
///
/// - API:
///   - POST /api/stripe-session - Create a hosted checkout session
///   - GET  /api/v1/sessions/{session_id}/status - Reconcile, JSON result
///
/// - Webhooks:
///   - POST /webhook/stripe - Stripe webhook handler
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/stripe-session", post(handlers::create_stripe_session))
        .route(
            "/v1/sessions/{session_id}/status",
            get(handlers::session_status),
        )
        .layer(cors);

    // Webhook routes (no CORS, must accept raw body)
    let webhook_routes = Router::new().route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/payment-success", get(handlers::payment_success))
        .route("/payment-result", get(handlers::payment_result))
        .route("/payment-cancel", get(handlers::payment_cancel))
        .nest("/api", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
