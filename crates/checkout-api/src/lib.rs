//! # checkout-api
//!
//! HTTP layer for hosted-checkout-rs.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Storefront with the demo cart |
//! | POST | `/api/stripe-session` | Create checkout session (`X-Idempotency-Key` required) |
//! | GET | `/payment-success?session_id=` | Verifying interstitial (Stripe's return URL) |
//! | GET | `/payment-result?session_id=` | Reconcile and show the payment result |
//! | GET | `/payment-cancel` | Cancel page |
//! | GET | `/api/v1/sessions/{session_id}/status` | Reconcile, JSON display state |
//! | POST | `/webhook/stripe` | Stripe webhook |
//! | GET | `/health` | Health check |

pub mod handlers;
pub mod pages;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
