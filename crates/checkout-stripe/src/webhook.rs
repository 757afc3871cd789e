//! # Stripe Webhook Handling
//!
//! Signature verification and event parsing for the checkout events the
//! shop listens to. The event body is never trusted for payment status:
//! handlers re-read the session from Stripe before touching the ledger.

use checkout_core::{CheckoutError, CheckoutResult};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

/// Maximum age of a signed webhook, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Checkout event kinds we distinguish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    CheckoutCompleted,
    AsyncPaymentSucceeded,
    AsyncPaymentFailed,
    CheckoutExpired,
    Unknown(String),
}

impl WebhookEventType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "checkout.session.completed" => Self::CheckoutCompleted,
            "checkout.session.async_payment_succeeded" => Self::AsyncPaymentSucceeded,
            "checkout.session.async_payment_failed" => Self::AsyncPaymentFailed,
            "checkout.session.expired" => Self::CheckoutExpired,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether this event may mean money has arrived and should be reconciled.
    pub fn may_settle_payment(&self) -> bool {
        matches!(self, Self::CheckoutCompleted | Self::AsyncPaymentSucceeded)
    }
}

/// A verified webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: WebhookEventType,
    /// Checkout session id, when the event object is a session
    pub session_id: Option<String>,
}

/// Verify the `Stripe-Signature` header, then parse the event.
///
/// The only way a webhook body becomes a `WebhookEvent`. `now` is the
/// current unix timestamp.
pub fn construct_event(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
) -> CheckoutResult<WebhookEvent> {
    verify_signature(secret, payload, header, now)?;
    parse_event(payload)
}

fn verify_signature(secret: &str, payload: &[u8], header: &str, now: i64) -> CheckoutResult<()> {
    let sig_parts = parse_signature_header(header)?;

    if now.abs_diff(sig_parts.timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(CheckoutError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected_sig = compute_signature(secret, sig_parts.timestamp, payload)?;

    let valid = sig_parts
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected_sig));

    if !valid {
        return Err(CheckoutError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }

    Ok(())
}

fn parse_event(payload: &[u8]) -> CheckoutResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
        CheckoutError::WebhookParseError(format!("Failed to parse webhook: {}", e))
    })?;

    debug!("Verified Stripe webhook: type={}", event.event_type);

    let session_id = match event.data.object.get("object").and_then(|v| v.as_str()) {
        Some("checkout.session") => event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from),
        _ => None,
    };

    Ok(WebhookEvent {
        event_id: event.id,
        event_type: WebhookEventType::parse(&event.event_type),
        session_id,
    })
}

/// `v1` signature for a payload signed at `timestamp`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> CheckoutResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| CheckoutError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> CheckoutResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        CheckoutError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(CheckoutError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
