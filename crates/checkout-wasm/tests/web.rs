//! Browser tests: `wasm-pack test --headless --firefox`
#![cfg(target_arch = "wasm32")]

use checkout_wasm::{calculate_cart_total, validate_cart, CheckoutButton};
use serde_json::json;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn js(value: serde_json::Value) -> wasm_bindgen::JsValue {
    serde_wasm_bindgen::to_value(&value).unwrap()
}

#[wasm_bindgen_test]
fn button_rejects_double_submit() {
    let mut button = CheckoutButton::new();
    let key = button.begin().unwrap();
    assert!(button.begin().is_err());
    button.fail("offline".to_string());
    assert_eq!(button.message().as_deref(), Some("offline"));
    assert_eq!(button.begin().unwrap(), key);
}

#[wasm_bindgen_test]
fn cart_helpers() {
    let cart = json!([
        { "productId": "1", "name": "Shoes", "unitPriceMinorUnits": 2000, "quantity": 2 },
        { "productId": "2", "name": "Shirts", "unitPriceMinorUnits": 1000, "quantity": 3 }
    ]);
    assert_eq!(calculate_cart_total(js(cart.clone())).unwrap(), 7000);
    assert!(validate_cart(js(cart)).is_ok());
    assert!(validate_cart(js(json!([]))).is_err());
}

#[wasm_bindgen_test]
fn zero_priced_line_is_invalid() {
    let cart = json!([
        { "productId": "1", "name": "Sticker", "unitPriceMinorUnits": 0, "quantity": 1 }
    ]);
    assert!(validate_cart(js(cart)).is_err());
}
