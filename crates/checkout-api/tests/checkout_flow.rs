use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use checkout_api::{create_router, AppConfig, AppState};
use checkout_core::{
    CheckoutAttempt, CheckoutError, CheckoutResult, CheckoutUrls, Currency, DemoCart, Fulfiller,
    FulfillmentLedger, FulfillmentRecord, Money, PaymentProcessor, PaymentStatus, SessionRef,
    SessionStatus, ORDER_REFERENCE_KEY,
};
use checkout_ledger::SqliteLedger;
use checkout_stripe::webhook::compute_signature;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const WEBHOOK_SECRET: &str = "whsec_test";

/// In-process stand-in for Stripe: dedupes creates by key, serves canned sessions.
#[derive(Default)]
struct FakeProcessor {
    sessions_by_key: Mutex<HashMap<String, SessionRef>>,
    statuses: Mutex<HashMap<String, SessionStatus>>,
    create_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
}

impl FakeProcessor {
    fn set_status(&self, status: SessionStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(status.session_id.clone(), status);
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_checkout_session(
        &self,
        attempt: &CheckoutAttempt,
        _urls: &CheckoutUrls,
    ) -> CheckoutResult<SessionRef> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions_by_key.lock().unwrap();
        let next_id = format!("cs_test_{}", sessions.len() + 1);
        let session = sessions
            .entry(attempt.idempotency_key.as_str().to_string())
            .or_insert_with(|| {
                SessionRef::new(
                    next_id.clone(),
                    Some(format!("https://checkout.example.com/{}", next_id)),
                )
            });
        Ok(session.clone())
    }

    async fn retrieve_session(&self, session_id: &str) -> CheckoutResult<SessionStatus> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| CheckoutError::UpstreamUnavailable("connection reset".into()))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
struct CountingFulfiller {
    calls: AtomicUsize,
}

#[async_trait]
impl Fulfiller for CountingFulfiller {
    async fn fulfill(&self, _: &FulfillmentRecord, _: &SessionStatus) -> CheckoutResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    server: TestServer,
    processor: Arc<FakeProcessor>,
    fulfiller: Arc<CountingFulfiller>,
    ledger: Arc<SqliteLedger>,
    _dir: TempDir,
}

async fn harness_with_secret(webhook_secret: Option<&str>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let processor = Arc::new(FakeProcessor::default());
    let fulfiller = Arc::new(CountingFulfiller::default());
    let ledger = Arc::new(
        SqliteLedger::open(dir.path().join("ledger.db"), fulfiller.clone())
            .await
            .unwrap(),
    );

    let state = AppState::from_parts(
        AppConfig::default(),
        processor.clone(),
        ledger.clone(),
        DemoCart::default(),
        Currency::PKR,
        webhook_secret.map(String::from),
    );

    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        processor,
        fulfiller,
        ledger,
        _dir: dir,
    }
}

async fn harness() -> Harness {
    harness_with_secret(Some(WEBHOOK_SECRET)).await
}

fn key_header() -> HeaderName {
    HeaderName::from_static("x-idempotency-key")
}

fn key_value(key: &str) -> HeaderValue {
    HeaderValue::from_str(key).unwrap()
}

fn cart() -> Value {
    json!([
        { "productId": "1", "name": "Shoes", "unitPriceMinorUnits": 2000, "quantity": 2 },
        { "productId": "2", "name": "Shirts", "unitPriceMinorUnits": 1000, "quantity": 3 },
        { "productId": "3", "name": "Jeans", "unitPriceMinorUnits": 6000, "quantity": 3 }
    ])
}

fn paid_session(id: &str) -> SessionStatus {
    SessionStatus::new(id, PaymentStatus::Paid)
        .with_amount(Money::new(2_300_000, Currency::PKR))
        .with_metadata(ORDER_REFERENCE_KEY, "ord_42")
}

const KEY_A: &str = "3f0c2a8e-54a1-4b7e-9d2f-0a1b2c3d4e5f";
const KEY_B: &str = "7d9e1f20-1c2b-4a3d-8e4f-5a6b7c8d9e0f";

#[tokio::test]
async fn same_key_returns_same_session() {
    let h = harness().await;

    let first = h
        .server
        .post("/api/stripe-session")
        .add_header(key_header(), key_value(KEY_A))
        .json(&cart())
        .await;
    let second = h
        .server
        .post("/api/stripe-session")
        .add_header(key_header(), key_value(KEY_A))
        .json(&cart())
        .await;

    assert_eq!(first.status_code(), StatusCode::OK);
    let first: Value = first.json();
    let second: Value = second.json();
    assert_eq!(first["success"], true);
    assert_eq!(first["sessionId"], second["sessionId"]);
    assert_eq!(first["url"], second["url"]);
}

#[tokio::test]
async fn different_keys_return_different_sessions() {
    let h = harness().await;

    let a: Value = h
        .server
        .post("/api/stripe-session")
        .add_header(key_header(), key_value(KEY_A))
        .json(&cart())
        .await
        .json();
    let b: Value = h
        .server
        .post("/api/stripe-session")
        .add_header(key_header(), key_value(KEY_B))
        .json(&cart())
        .await
        .json();

    assert_ne!(a["sessionId"], b["sessionId"]);
}

#[tokio::test]
async fn empty_cart_is_rejected_without_calling_processor() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/stripe-session")
        .add_header(key_header(), key_value(KEY_A))
        .json(&json!([]))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().len() > 0);
    assert_eq!(h.processor.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_or_malformed_key_is_rejected() {
    let h = harness().await;

    let missing = h.server.post("/api/stripe-session").json(&cart()).await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);

    let malformed = h
        .server
        .post("/api/stripe-session")
        .add_header(key_header(), key_value("not-a-uuid"))
        .json(&cart())
        .await;
    assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(malformed.json::<Value>()["success"], false);

    assert_eq!(h.processor.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_cart_body_is_rejected() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/stripe-session")
        .add_header(key_header(), key_value(KEY_A))
        .json(&json!({ "items": "nope" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
    assert_eq!(h.processor.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn return_pages_without_session_id_redirect_home() {
    let h = harness().await;

    for path in [
        "/payment-success",
        "/payment-success?session_id=",
        "/payment-result",
        "/payment-result?session_id=%20",
    ] {
        let response = h.server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location").to_str().unwrap(), "/");
    }

    assert_eq!(h.processor.retrieve_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.ledger.fulfilled_count().await.unwrap(), 0);
}

#[tokio::test]
async fn return_url_shows_verifying_before_reconciling() {
    let h = harness().await;
    h.processor.set_status(paid_session("cs_paid"));

    let response = h.server.get("/payment-success?session_id=cs_paid").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("Verifying Payment..."));
    assert!(html.contains("/payment-result?session_id=cs_paid"));
    assert_eq!(h.processor.retrieve_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.fulfiller.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn paid_session_is_fulfilled_once_across_refreshes() {
    let h = harness().await;
    h.processor.set_status(paid_session("cs_paid"));

    for _ in 0..3 {
        let response = h.server.get("/payment-result?session_id=cs_paid").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let html = response.text();
        assert!(html.contains("Payment Successful!"));
        assert!(html.contains("PKR 23000.00"));
        assert!(html.contains("ord_42"));
    }

    assert_eq!(h.fulfiller.calls.load(Ordering::SeqCst), 1);
    let record = h.ledger.get("cs_paid").await.unwrap().unwrap();
    assert_eq!(record.business_order_id, "ord_42");
}

#[tokio::test]
async fn open_session_shows_retry_and_writes_nothing() {
    let h = harness().await;
    h.processor
        .set_status(SessionStatus::new("cs_open", PaymentStatus::Pending));

    let response = h.server.get("/payment-result?session_id=cs_open").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("Try Payment Again"));
    assert!(h.ledger.get("cs_open").await.unwrap().is_none());
}

#[tokio::test]
async fn upstream_failure_shows_unknown_and_leaves_ledger_untouched() {
    let h = harness().await;

    let response = h.server.get("/payment-result?session_id=cs_down").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("Payment Status Unknown"));
    assert!(html.contains("Try Payment Again"));
    assert_eq!(h.ledger.fulfilled_count().await.unwrap(), 0);
    assert_eq!(h.fulfiller.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn status_endpoint_reports_display_state() {
    let h = harness().await;
    h.processor.set_status(paid_session("cs_json"));

    let first: Value = h.server.get("/api/v1/sessions/cs_json/status").await.json();
    let second: Value = h.server.get("/api/v1/sessions/cs_json/status").await.json();

    assert_eq!(first["state"], "paid");
    assert_eq!(first["business_order_id"], "ord_42");
    assert_eq!(first["newly_fulfilled"], true);
    assert_eq!(second["newly_fulfilled"], false);
}

fn signed(payload: &str) -> (HeaderName, HeaderValue) {
    let timestamp = chrono::Utc::now().timestamp();
    let signature = compute_signature(WEBHOOK_SECRET, timestamp, payload.as_bytes()).unwrap();
    (
        HeaderName::from_static("stripe-signature"),
        HeaderValue::from_str(&format!("t={},v1={}", timestamp, signature)).unwrap(),
    )
}

fn completed_event(session_id: &str) -> String {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": { "id": session_id, "object": "checkout.session", "payment_status": "paid" } }
    })
    .to_string()
}

#[tokio::test]
async fn webhook_and_return_page_fulfill_once() {
    let h = harness().await;
    h.processor.set_status(paid_session("cs_hook"));

    let payload = completed_event("cs_hook");
    let (name, value) = signed(&payload);
    let webhook = h
        .server
        .post("/webhook/stripe")
        .add_header(name, value)
        .text(payload);
    let page = h.server.get("/payment-result?session_id=cs_hook");

    let (webhook, page) = tokio::join!(webhook, page);

    assert_eq!(webhook.status_code(), StatusCode::OK);
    assert!(page.text().contains("Payment Successful!"));
    assert_eq!(h.fulfiller.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_refused() {
    let h = harness().await;
    h.processor.set_status(paid_session("cs_forged"));

    let response = h
        .server
        .post("/webhook/stripe")
        .add_header(
            HeaderName::from_static("stripe-signature"),
            HeaderValue::from_static("t=1,v1=deadbeef"),
        )
        .text(completed_event("cs_forged"))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.processor.retrieve_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.fulfiller.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn webhook_asks_for_redelivery_when_processor_is_down() {
    let h = harness().await;

    let payload = completed_event("cs_unreachable");
    let (name, value) = signed(&payload);
    let response = h
        .server
        .post("/webhook/stripe")
        .add_header(name, value)
        .text(payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn webhook_refused_without_secret() {
    let h = harness_with_secret(None).await;

    let payload = completed_event("cs_any");
    let (name, value) = signed(&payload);
    let response = h
        .server
        .post("/webhook/stripe")
        .add_header(name, value)
        .text(payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.processor.retrieve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn storefront_and_static_pages_render() {
    let h = harness().await;

    let home = h.server.get("/").await;
    assert_eq!(home.status_code(), StatusCode::OK);
    let html = home.text();
    assert!(html.contains("Shoes"));
    assert!(html.contains("X-Idempotency-Key"));

    let cancel = h.server.get("/payment-cancel").await;
    assert!(cancel.text().contains("Payment Cancelled"));

    let health: Value = h.server.get("/health").await.json();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn health_reports_unavailable_ledger() {
    let h = harness().await;
    h.ledger.close().await;

    let response = h.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["status"], "unhealthy");
}
