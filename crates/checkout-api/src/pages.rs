//! # Pages
//!
//! HTML views for the storefront, the payment result and the cancel page.

use askama::Template;
use askama_web::WebTemplate;
use checkout_core::{cart_total_minor_units, CartLine, Currency, DisplayState, Money};

/// One row of the storefront cart table
pub struct LineView {
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub total: String,
}

/// Storefront home page with the demo cart and checkout button
#[derive(Template, WebTemplate)]
#[template(path = "storefront.html")]
pub struct StorefrontPage {
    pub lines: Vec<LineView>,
    pub total: String,
    /// Cart as JSON, posted as-is to the session endpoint
    pub cart_json: String,
}

impl StorefrontPage {
    pub fn new(lines: &[CartLine], currency: Currency) -> Self {
        let price = |minor| Money::new(minor, currency).display();

        // `<` is escaped so product names cannot close the script element.
        let cart_json = serde_json::to_string(lines)
            .unwrap_or_else(|_| "[]".to_string())
            .replace('<', "\\u003c");

        Self {
            lines: lines
                .iter()
                .map(|line| LineView {
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: price(line.unit_price_minor_units),
                    total: price(line.total_minor_units()),
                })
                .collect(),
            total: price(cart_total_minor_units(lines)),
            cart_json,
        }
    }
}

/// Payment result page rendered from a reconciliation
#[derive(Debug, Template, WebTemplate)]
#[template(path = "result.html")]
pub struct ResultPage {
    pub icon: &'static str,
    pub heading: &'static str,
    pub message: String,
    pub session_id: String,
    pub order_id: String,
    pub amount: String,
    pub retryable: bool,
    pub auto_refresh: bool,
}

impl ResultPage {
    /// `None` for `RedirectHome`, which has no page.
    pub fn from_state(state: &DisplayState) -> Option<Self> {
        let amount_text = |amount: &Option<Money>| amount.map(|m| m.display()).unwrap_or_default();
        let retryable = state.is_retryable();

        let page = match state {
            DisplayState::RedirectHome => return None,
            DisplayState::Paid {
                session_id,
                business_order_id,
                amount,
                ..
            } => ResultPage {
                icon: "✅",
                heading: "Payment Successful!",
                message: "Thank you for your order. A confirmation is on its way.".to_string(),
                session_id: session_id.clone(),
                order_id: business_order_id.clone(),
                amount: amount_text(amount),
                retryable,
                auto_refresh: false,
            },
            DisplayState::Unrecorded { session_id } => ResultPage {
                icon: "⏳",
                heading: "Recording Your Order",
                message: "Your payment was received and your order is being recorded. This page will refresh.".to_string(),
                session_id: session_id.clone(),
                order_id: String::new(),
                amount: String::new(),
                retryable,
                auto_refresh: true,
            },
            DisplayState::Pending { session_id, amount } => ResultPage {
                icon: "🕒",
                heading: "Payment Not Completed",
                message: "We have not received your payment yet.".to_string(),
                session_id: session_id.clone(),
                order_id: String::new(),
                amount: amount_text(amount),
                retryable,
                auto_refresh: false,
            },
            DisplayState::Unknown { session_id, .. } => ResultPage {
                icon: "⚠️",
                heading: "Payment Status Unknown",
                message: "We could not confirm your payment right now. Please check again shortly."
                    .to_string(),
                session_id: session_id.clone(),
                order_id: String::new(),
                amount: String::new(),
                retryable,
                auto_refresh: false,
            },
        };

        Some(page)
    }
}

/// Interstitial shown while the return visit is being reconciled
#[derive(Debug, Template, WebTemplate)]
#[template(path = "verifying.html")]
pub struct VerifyingPage {
    pub session_id: String,
}

/// Shown when the customer backs out of the hosted page
#[derive(Template, WebTemplate)]
#[template(path = "cancel.html")]
pub struct CancelPage {}
