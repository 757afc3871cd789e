//! # checkout-wasm
//!
//! WebAssembly bindings for the storefront's checkout button.
//!
//! This crate provides:
//! - One idempotency key per checkout attempt, reused on every retry
//! - An explicit button lifecycle (idle → pending → success | error)
//! - Client-side cart validation and amount formatting
//! - A `fetch` call to the session endpoint
//!
//! The storefront page served by `checkout-api` does not load this bundle;
//! it carries a small inline script with the same lifecycle. This crate is
//! for frontends that embed the checkout button themselves.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { CheckoutButton, create_checkout_session } from 'checkout-wasm';
//!
//! await init();
//! const button = new CheckoutButton();
//!
//! async function onClick(cart) {
//!   const key = button.begin();          // throws while pending
//!   try {
//!     const res = await create_checkout_session('/api/stripe-session', key, cart);
//!     button.succeed(res.url);
//!     window.location.href = res.url;
//!   } catch (e) {
//!     button.fail(String(e));            // retry reuses the same key
//!   }
//! }
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use checkout_core::{
    cart_total_minor_units, CartLimits, CartLine, Currency, IdempotencyKey, Money,
    IDEMPOTENCY_HEADER,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Where the checkout button is in its request lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Pending,
    Success { redirect_url: String },
    Error { message: String },
}

impl ButtonState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonState::Idle => "idle",
            ButtonState::Pending => "pending",
            ButtonState::Success { .. } => "success",
            ButtonState::Error { .. } => "error",
        }
    }
}

/// Lifecycle of one checkout attempt.
///
/// The key is fixed when the attempt starts; a failed submit goes back to
/// the processor with the same key, so it can never open a second session.
#[derive(Debug, Clone)]
pub struct CheckoutLifecycle {
    key: IdempotencyKey,
    state: ButtonState,
}

impl CheckoutLifecycle {
    pub fn new() -> Self {
        Self {
            key: IdempotencyKey::new(),
            state: ButtonState::Idle,
        }
    }

    pub fn key(&self) -> &IdempotencyKey {
        &self.key
    }

    pub fn state(&self) -> &ButtonState {
        &self.state
    }

    /// Whether clicks should be ignored
    pub fn is_busy(&self) -> bool {
        matches!(self.state, ButtonState::Pending | ButtonState::Success { .. })
    }

    /// Start a submit; `None` while one is in flight or after success.
    pub fn begin(&mut self) -> Option<&IdempotencyKey> {
        if self.is_busy() {
            return None;
        }
        self.state = ButtonState::Pending;
        Some(&self.key)
    }

    pub fn succeed(&mut self, redirect_url: impl Into<String>) {
        if self.state == ButtonState::Pending {
            self.state = ButtonState::Success {
                redirect_url: redirect_url.into(),
            };
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        if self.state == ButtonState::Pending {
            self.state = ButtonState::Error {
                message: message.into(),
            };
        }
    }

    /// The cart changed: this is a new attempt with a new key.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for CheckoutLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Checkout button bound to one attempt
#[wasm_bindgen]
pub struct CheckoutButton {
    inner: CheckoutLifecycle,
}

#[wasm_bindgen]
impl CheckoutButton {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: CheckoutLifecycle::new(),
        }
    }

    /// Idempotency key of the current attempt
    #[wasm_bindgen(getter)]
    pub fn key(&self) -> String {
        self.inner.key().to_string()
    }

    /// "idle", "pending", "success" or "error"
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.inner.state().as_str().to_string()
    }

    /// Error toast text, when the last submit failed
    #[wasm_bindgen(getter)]
    pub fn message(&self) -> Option<String> {
        match self.inner.state() {
            ButtonState::Error { message } => Some(message.clone()),
            _ => None,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn busy(&self) -> bool {
        self.inner.is_busy()
    }

    /// Move to pending and return the key to send.
    pub fn begin(&mut self) -> Result<String, JsValue> {
        self.inner
            .begin()
            .map(|key| key.to_string())
            .ok_or_else(|| JsValue::from_str("checkout already in progress"))
    }

    pub fn succeed(&mut self, redirect_url: String) {
        self.inner.succeed(redirect_url);
    }

    pub fn fail(&mut self, message: String) {
        self.inner.fail(message);
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl Default for CheckoutButton {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a fresh idempotency key
#[wasm_bindgen]
pub fn new_idempotency_key() -> String {
    IdempotencyKey::new().to_string()
}

fn cart_from_js(lines: JsValue) -> Result<Vec<CartLine>, JsValue> {
    serde_wasm_bindgen::from_value(lines)
        .map_err(|e| JsValue::from_str(&format!("Invalid cart lines: {}", e)))
}

/// Check a cart the same way the server will, before sending it.
#[wasm_bindgen]
pub fn validate_cart(lines: JsValue) -> Result<(), JsValue> {
    let lines = cart_from_js(lines)?;
    CartLimits::default()
        .validate(&lines)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Total of a cart in minor units
#[wasm_bindgen]
pub fn calculate_cart_total(lines: JsValue) -> Result<i64, JsValue> {
    let lines = cart_from_js(lines)?;
    Ok(cart_total_minor_units(&lines))
}

/// Format minor units for display, e.g. `format_amount(2300000, "pkr")` → "PKR 23000.00"
#[wasm_bindgen]
pub fn format_amount(amount_minor: i64, currency: &str) -> Result<String, JsValue> {
    format_amount_inner(amount_minor, currency).map_err(|e| JsValue::from_str(&e))
}

fn format_amount_inner(amount_minor: i64, currency: &str) -> Result<String, String> {
    let currency: Currency = currency.parse()?;
    Ok(Money::new(amount_minor, currency).display())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// POST the cart to the session endpoint with the attempt's key.
///
/// Resolves to `{ sessionId, url }`; rejects with the server's message.
#[wasm_bindgen]
pub async fn create_checkout_session(
    endpoint: String,
    key: String,
    lines: JsValue,
) -> Result<JsValue, JsValue> {
    let key = IdempotencyKey::parse(&key).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let lines = cart_from_js(lines)?;
    let body = serde_json::to_string(&lines)
        .map_err(|e| JsValue::from_str(&format!("Failed to encode cart: {}", e)))?;

    let opts = web_sys::RequestInit::new();
    opts.set_method("POST");
    opts.set_body(&JsValue::from_str(&body));

    let request = web_sys::Request::new_with_str_and_init(&endpoint, &opts)?;
    request.headers().set("Content-Type", "application/json")?;
    request.headers().set(IDEMPOTENCY_HEADER, key.as_str())?;

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&request))
        .await?
        .dyn_into()?;

    let json = JsFuture::from(response.json()?).await?;
    let parsed: SessionResponse = serde_wasm_bindgen::from_value(json)
        .map_err(|e| JsValue::from_str(&format!("Unexpected response: {}", e)))?;

    match (response.ok() && parsed.success, parsed.session_id, parsed.url) {
        (true, Some(session_id), Some(url)) => {
            let result = serde_json::json!({ "sessionId": session_id, "url": url });
            serde_wasm_bindgen::to_value(&result)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        }
        _ => Err(JsValue::from_str(
            parsed
                .message
                .as_deref()
                .unwrap_or("Checkout could not be started"),
        )),
    }
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
