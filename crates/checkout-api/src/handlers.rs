//! # Request Handlers
//!
//! Axum request handlers for the storefront, session creation,
//! the payment result pages and Stripe webhooks.

use crate::pages::{CancelPage, ResultPage, StorefrontPage, VerifyingPage};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use checkout_core::{
    CartLine, CheckoutError, DisplayState, ErrorKind, IdempotencyKey, IDEMPOTENCY_HEADER,
};
use checkout_stripe::construct_event;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Session creation response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    /// Hosted page URL (redirect the customer here)
    pub url: Option<String>,
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub success: bool,
    pub code: u16,
    /// Whether the client may retry with the same idempotency key
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            success: false,
            code,
            retryable: false,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn checkout_error_to_response(err: CheckoutError) -> ApiError {
    let code = err.status_code();

    // Operator-side detail stays in the logs.
    let message = match err.kind() {
        ErrorKind::Configuration | ErrorKind::Internal => {
            error!("Internal failure: {}", err);
            "Something went wrong on our side. Please try again later.".to_string()
        }
        ErrorKind::InputValidation | ErrorKind::UpstreamFailure | ErrorKind::LedgerFailure => {
            err.to_string()
        }
    };

    let response = ErrorResponse {
        retryable: err.is_retryable(),
        ..ErrorResponse::new(message, code)
    };
    (StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(response))
}

/// Query string of the success return URL
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
///
/// Answers 503 when the fulfillment ledger cannot be reached.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (code, status) = match state.ledger.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "service": "hosted-checkout",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Storefront home page with the demo cart
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    StorefrontPage::new(&state.demo_cart.lines, state.currency)
}

/// Create a hosted checkout session for the posted cart.
///
/// The `X-Idempotency-Key` header is required; retries of the same attempt
/// must send the same key and get the same session back.
#[instrument(skip(state, headers, body))]
pub async fn create_stripe_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Vec<CartLine>>, JsonRejection>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let key = headers
        .get(IDEMPOTENCY_HEADER)
        .ok_or_else(|| {
            CheckoutError::InvalidIdempotencyKey("missing X-Idempotency-Key header".to_string())
        })
        .and_then(|value| {
            value.to_str().map_err(|_| {
                CheckoutError::InvalidIdempotencyKey("header is not valid text".to_string())
            })
        })
        .and_then(IdempotencyKey::parse)
        .map_err(checkout_error_to_response)?;

    let Json(lines) = body.map_err(|rejection| {
        warn!("Rejected cart body: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                format!("Invalid cart: {}", rejection.body_text()),
                400,
            )),
        )
    })?;

    let session = state
        .gateway
        .create_session(lines, key)
        .await
        .map_err(|e| {
            error!("Error creating checkout session: {}", e);
            checkout_error_to_response(e)
        })?;

    Ok(Json(CreateSessionResponse {
        session_id: session.session_id,
        url: session.checkout_url,
        success: true,
    }))
}

/// Return URL of the hosted checkout.
///
/// Answers at once with the verifying interstitial, which hands off to
/// `/payment-result`. No session id means nothing to verify.
pub async fn payment_success(Query(query): Query<SuccessQuery>) -> Response {
    match query.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(session_id) => VerifyingPage {
            session_id: session_id.to_string(),
        }
        .into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// Payment result page.
///
/// Never trusts the query string for payment status; the reconciler asks
/// the processor.
pub async fn payment_result(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> Response {
    let display = state.reconciler.reconcile(query.session_id.as_deref()).await;

    match ResultPage::from_state(&display) {
        Some(page) => page.into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// Checkout cancel page
pub async fn payment_cancel() -> impl IntoResponse {
    CancelPage {}
}

/// Reconcile a session and report the display state as JSON
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<DisplayState> {
    Json(state.reconciler.reconcile(Some(&session_id)).await)
}

/// Handle a Stripe webhook
///
/// Completion events run the same retrieve-then-claim path as the success
/// page. Answers 503 when the session could not be confirmed or recorded so
/// Stripe redelivers.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let secret = state.webhook_secret.as_deref().ok_or_else(|| {
        checkout_error_to_response(CheckoutError::Configuration(
            "STRIPE_WEBHOOK_SECRET not set".to_string(),
        ))
    })?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            checkout_error_to_response(CheckoutError::WebhookVerificationFailed(
                "Missing Stripe-Signature header".to_string(),
            ))
        })?;

    let event = construct_event(secret, &body, signature, Utc::now().timestamp()).map_err(|e| {
        warn!("Webhook rejected: {}", e);
        checkout_error_to_response(e)
    })?;

    info!(
        "Webhook received: id={}, type={:?}",
        event.event_id, event.event_type
    );

    let session_id = match event.session_id {
        Some(id) if event.event_type.may_settle_payment() => id,
        _ => return Ok(StatusCode::OK),
    };

    match state.reconciler.reconcile(Some(&session_id)).await {
        DisplayState::Unrecorded { .. } | DisplayState::Unknown { .. } => {
            warn!("Session {} not settled yet, asking for redelivery", session_id);
            Ok(StatusCode::SERVICE_UNAVAILABLE)
        }
        _ => Ok(StatusCode::OK),
    }
}
