#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use mf_wasm::{extract_fields, get_categories, init_catalog, is_initialized, should_filter, validate_filters, BackgroundWorker};

#[wasm_bindgen_test]
fn keyword_hides_market() {
    let config = r#"{"keywords":["election"],"categories":[],"priceRange":{"min":0,"max":100},"volumeThreshold":0,"liquidityThreshold":0,"enabled":true}"#;
    assert!(should_filter("Will the election be delayed?", config).unwrap());
    assert!(!should_filter("Will it snow?", config).unwrap());
}

#[wasm_bindgen_test]
fn disabled_config_hides_nothing() {
    let config = r#"{"keywords":["election"],"enabled":false}"#;
    assert!(!should_filter("Will the election be delayed?", config).unwrap());
}

#[wasm_bindgen_test]
fn extract_fields_object() {
    let fields = extract_fields("Price 42% Volume $1.5M");
    let price = js_sys::Reflect::get(&fields, &"price".into()).unwrap();
    let volume = js_sys::Reflect::get(&fields, &"volumeUsd".into()).unwrap();
    let liquidity = js_sys::Reflect::get(&fields, &"liquidityUsd".into()).unwrap();
    assert_eq!(price.as_f64(), Some(42.0));
    assert_eq!(volume.as_f64(), Some(1_500_000.0));
    assert_eq!(liquidity, JsValue::NULL);
}

#[wasm_bindgen_test]
fn validate_rejects_inverted_range() {
    assert!(validate_filters(r#"{"priceRange":{"min":70,"max":30}}"#).is_err());
    assert!(validate_filters("{}").is_ok());
}

#[wasm_bindgen_test]
fn background_forwards_updates() {
    let mut worker = BackgroundWorker::new(None).unwrap();
    let result = worker
        .handle(r#"{"action":"updateFilters","filters":{"keywords":["fed"]}}"#)
        .unwrap();
    let forward = js_sys::Reflect::get(&result, &"forward".into()).unwrap();
    let action = js_sys::Reflect::get(&forward, &"action".into()).unwrap();
    assert_eq!(action.as_string().as_deref(), Some("applyFilters"));
    assert!(worker.settings().unwrap().contains("\"fed\""));
}

#[wasm_bindgen_test]
fn catalog_can_be_loaded_after_builtin_use() {
    let config = r#"{"categories":["custom"]}"#;
    assert!(!should_filter("Will it snow?", config).unwrap());
    assert!(!is_initialized());

    let catalog = r#"{"categories":[{"id":"custom","name":"Custom","keywords":["snow"]}]}"#;
    init_catalog(catalog).unwrap();
    assert!(is_initialized());
    assert!(should_filter("Will it snow?", config).unwrap());
    assert_eq!(js_sys::Array::from(&get_categories().unwrap()).length(), 1);
    assert!(init_catalog(catalog).is_err());
}
