//! WebAssembly bindings for MarketFilter

use std::sync::OnceLock;

use mf_core::protocol::Background;
use mf_core::settings::MemoryStore;
use mf_core::{
    Candidate, CategoryCatalog, ExtensionSettings, FieldExtractor, FilterConfig, FilterEngine, FilterSession,
    PageProfile, ScanReport, TextExtractor,
};
use wasm_bindgen::prelude::*;

mod dom;

use dom::{inserted_node, DomPage};

static CATALOG: OnceLock<CategoryCatalog> = OnceLock::new();

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Load `categories.json`. A broken catalog degrades to an empty one.
///
/// May be called once. Calls made before it use the built-in catalog;
/// `ContentFilter`s and `BackgroundWorker`s keep the catalog they were
/// constructed with.
#[wasm_bindgen]
pub fn init_catalog(catalog_json: &str) -> Result<(), JsValue> {
    if CATALOG.get().is_some() {
        return Err(JsValue::from_str("Catalog already initialized. Reload the page to reinitialize."));
    }
    CATALOG
        .set(CategoryCatalog::load_or_empty(catalog_json))
        .map_err(|_| JsValue::from_str("Failed to set catalog"))
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    CATALOG.get().is_some()
}

/// The loaded catalog, or the built-in one until `init_catalog` runs.
fn catalog() -> &'static CategoryCatalog {
    static BUILTIN: OnceLock<CategoryCatalog> = OnceLock::new();
    match CATALOG.get() {
        Some(catalog) => catalog,
        None => BUILTIN.get_or_init(CategoryCatalog::builtin),
    }
}

fn parse_config(config_json: &str) -> Result<FilterConfig, JsValue> {
    serde_json::from_str(config_json).map_err(|e| JsValue::from_str(&format!("Failed to parse filters: {}", e)))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&json)
}

fn report_to_js(report: &ScanReport) -> JsValue {
    to_js(report).unwrap_or(JsValue::NULL)
}

fn now(now_ms: f64) -> u64 {
    now_ms.max(0.0) as u64
}

/// Category definitions for the popup's checkbox grid.
#[wasm_bindgen]
pub fn get_categories() -> Result<JsValue, JsValue> {
    to_js(&catalog().definitions())
}

#[wasm_bindgen]
pub fn validate_filters(config_json: &str) -> Result<(), JsValue> {
    parse_config(config_json)?
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn extract_fields(text: &str) -> JsValue {
    let fields = TextExtractor.extract(&text.to_lowercase());
    let result = js_sys::Object::new();
    for (key, value) in [
        ("price", fields.price),
        ("volumeUsd", fields.volume_usd),
        ("liquidityUsd", fields.liquidity_usd),
    ] {
        let value = value.map_or(JsValue::NULL, JsValue::from);
        let _ = js_sys::Reflect::set(&result, &key.into(), &value);
    }
    result.into()
}

#[wasm_bindgen]
pub fn should_filter(text: &str, config_json: &str) -> Result<bool, JsValue> {
    let config = parse_config(config_json)?;
    let candidate = Candidate::new(0, Some(text.to_string()), text);
    Ok(FilterEngine::new().decide(&candidate, &config, catalog()).hide)
}

/// Evaluate `[{id, title, text}]` without touching the DOM.
#[wasm_bindgen]
pub fn evaluate(candidates: JsValue, config_json: &str) -> Result<JsValue, JsValue> {
    let config = parse_config(config_json)?;
    let array = js_sys::Array::from(&candidates);

    let mut parsed = Vec::with_capacity(array.length() as usize);
    for (idx, entry) in array.iter().enumerate() {
        let id = js_sys::Reflect::get(&entry, &"id".into())
            .ok()
            .and_then(|v| v.as_f64())
            .map_or(idx as u32, |v| v as u32);
        let title = js_sys::Reflect::get(&entry, &"title".into())
            .ok()
            .and_then(|v| v.as_string());
        let text = js_sys::Reflect::get(&entry, &"text".into())
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        parsed.push(Candidate::new(id, title, &text));
    }

    let report = FilterEngine::new().evaluate(&parsed, &config, catalog());
    Ok(report_to_js(&report))
}

// =============================================================================
// Content script
// =============================================================================

/// Per-tab filter state driven by the content script.
///
/// JS owns the timers and the MutationObserver: after every call, arm a
/// timeout for `nextDeadline()` and call `tick(Date.now())` when it fires.
#[wasm_bindgen]
pub struct ContentFilter {
    session: FilterSession,
    profile: PageProfile,
    document: web_sys::Document,
}

#[wasm_bindgen]
impl ContentFilter {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, profile_json: Option<String>) -> Result<ContentFilter, JsValue> {
        let config = match config_json {
            Some(json) => parse_config(&json)?,
            None => FilterConfig::default(),
        };
        let profile: PageProfile = match profile_json {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse page profile: {}", e)))?,
            None => PageProfile::default(),
        };
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("No document available"))?;

        let session = FilterSession::new(catalog().clone(), config, profile.clone());
        Ok(Self {
            session,
            profile,
            document,
        })
    }

    /// Schedule the initial pass. Returns its deadline.
    pub fn start(&mut self, now_ms: f64) -> f64 {
        self.session.start(now(now_ms)) as f64
    }

    #[wasm_bindgen(js_name = nextDeadline)]
    pub fn next_deadline(&self) -> Option<f64> {
        self.session.next_deadline().map(|d| d as f64)
    }

    /// Run the pending pass if due. Returns the report or `null`.
    pub fn tick(&mut self, now_ms: f64) -> JsValue {
        let mut page = DomPage::new(self.document.clone(), &self.profile);
        match self.session.tick(now(now_ms), &mut page) {
            Some(report) => report_to_js(&report),
            None => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = applyNow)]
    pub fn apply_now(&mut self) -> JsValue {
        let mut page = DomPage::new(self.document.clone(), &self.profile);
        report_to_js(&self.session.apply_now(&mut page))
    }

    /// `applyFilters` message from the background worker.
    #[wasm_bindgen(js_name = updateConfig)]
    pub fn update_config(&mut self, now_ms: f64, config_json: &str) -> Result<(), JsValue> {
        let config = parse_config(config_json)?;
        let mut page = DomPage::new(self.document.clone(), &self.profile);
        self.session.update_config(now(now_ms), config, &mut page);
        Ok(())
    }

    /// Indicator click. Returns the new config JSON for `chrome.storage`.
    #[wasm_bindgen(js_name = toggleEnabled)]
    pub fn toggle_enabled(&mut self, now_ms: f64) -> Result<String, JsValue> {
        let mut page = DomPage::new(self.document.clone(), &self.profile);
        let config = self.session.toggle_enabled(now(now_ms), &mut page);
        serde_json::to_string(&config).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Feed `MutationRecord.addedNodes`. Returns true if a pass was scheduled.
    #[wasm_bindgen(js_name = onMutations)]
    pub fn on_mutations(&mut self, now_ms: f64, added_nodes: js_sys::Array) -> bool {
        let nodes: Vec<_> = added_nodes
            .iter()
            .map(|node| inserted_node(&node, &self.profile))
            .collect();
        self.session.on_insertions(now(now_ms), &nodes)
    }

    #[wasm_bindgen(js_name = hiddenCount)]
    pub fn hidden_count(&self) -> u32 {
        self.session.last_report().map_or(0, |r| r.hidden_count as u32)
    }

    #[wasm_bindgen(js_name = candidateSelector)]
    pub fn candidate_selector(&self) -> String {
        self.profile.candidate_selector()
    }
}

// =============================================================================
// Background worker
// =============================================================================

/// Message handler for the background worker.
///
/// `chrome.storage` is async, so JS loads the settings, hands them in, and
/// persists `settings()` after every mutating message.
#[wasm_bindgen]
pub struct BackgroundWorker {
    inner: Background<MemoryStore>,
}

#[wasm_bindgen]
impl BackgroundWorker {
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<BackgroundWorker, JsValue> {
        let store = match settings_json {
            Some(json) => MemoryStore::with_settings(
                ExtensionSettings::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
            ),
            None => MemoryStore::new(),
        };
        Ok(Self {
            inner: Background::new(store, Some(catalog().clone())),
        })
    }

    #[wasm_bindgen(js_name = installDefaults)]
    pub fn install_defaults(&mut self) -> Result<(), JsValue> {
        self.inner
            .install_defaults()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Handle one runtime message. Returns `{response, forward}` where
    /// `forward` is a message for the active tab or `null`.
    pub fn handle(&mut self, message_json: &str) -> Result<JsValue, JsValue> {
        let (response, forward) = self
            .inner
            .handle_json(message_json)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let result = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&result, &"response".into(), &js_sys::JSON::parse(&response)?);
        let forward = match forward {
            Some(request) => to_js(&request)?,
            None => JsValue::NULL,
        };
        let _ = js_sys::Reflect::set(&result, &"forward".into(), &forward);
        Ok(result.into())
    }

    /// Current settings as storage JSON.
    pub fn settings(&self) -> Result<String, JsValue> {
        use mf_core::SettingsStore;
        self.inner
            .store()
            .load_or_default()
            .and_then(|s| s.to_json())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
