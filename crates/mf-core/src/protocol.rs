//! Runtime messages between popup, background worker and content script.
//!
//! Requests are JSON objects tagged by `action`, exactly as the extension
//! sends them. [`Background`] answers them against a [`SettingsStore`].

use serde::{Deserialize, Serialize};

use crate::catalog::{Category, CategoryCatalog};
use crate::settings::{ExtensionSettings, SavedFilterConfig, SettingsError, SettingsStore, TrackedMarket};
use crate::types::FilterConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetFilters,
    UpdateFilters { filters: FilterConfig },
    SaveFilterConfig { config: SavedFilterConfig },
    GetSavedFilters,
    TrackMarket { market: TrackedMarket },
    GetTrackedMarkets,
    GetCategoriesConfig,
    /// Background -> content script: apply this snapshot now.
    ApplyFilters { filters: FilterConfig },
}

impl Request {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Filters(FilterConfig),
    Success { success: bool },
    SavedFilters(Vec<SavedFilterConfig>),
    TrackedMarkets(Vec<TrackedMarket>),
    Categories { categories: Option<Vec<Category>> },
}

impl Response {
    fn ok() -> Self {
        Self::Success { success: true }
    }
}

/// Background worker logic: owns the store and the catalog.
pub struct Background<S> {
    store: S,
    catalog: Option<CategoryCatalog>,
}

impl<S: SettingsStore> Background<S> {
    pub fn new(store: S, catalog: Option<CategoryCatalog>) -> Self {
        Self { store, catalog }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write install defaults, replacing whatever was stored.
    pub fn install_defaults(&mut self) -> Result<(), SettingsError> {
        log::info!("Extension installed or updated, writing default settings");
        self.store.save(&ExtensionSettings::default())
    }

    /// Answer one request. `UpdateFilters` returns the snapshot that must be
    /// forwarded to content scripts as `ApplyFilters`.
    pub fn handle(&mut self, request: Request) -> Result<(Response, Option<Request>), SettingsError> {
        log::debug!("Received message: {:?}", request);
        match request {
            Request::GetFilters => {
                let settings = self.store.load_or_default()?;
                Ok((Response::Filters(settings.filters), None))
            }
            Request::UpdateFilters { filters } => {
                let mut settings = self.store.load_or_default()?;
                settings.update_filters(filters.clone())?;
                self.store.save(&settings)?;
                Ok((Response::ok(), Some(Request::ApplyFilters { filters })))
            }
            Request::SaveFilterConfig { config } => {
                let mut settings = self.store.load_or_default()?;
                settings.push_preset(config)?;
                self.store.save(&settings)?;
                log::debug!("Filter configuration saved, total configs: {}", settings.saved_filters.len());
                Ok((Response::ok(), None))
            }
            Request::GetSavedFilters => {
                let settings = self.store.load_or_default()?;
                Ok((Response::SavedFilters(settings.saved_filters), None))
            }
            Request::TrackMarket { market } => {
                let mut settings = self.store.load_or_default()?;
                settings.track_market(market);
                self.store.save(&settings)?;
                Ok((Response::ok(), None))
            }
            Request::GetTrackedMarkets => {
                let settings = self.store.load_or_default()?;
                Ok((Response::TrackedMarkets(settings.tracked_markets), None))
            }
            Request::GetCategoriesConfig => {
                let categories = self.catalog.as_ref().map(CategoryCatalog::definitions);
                if categories.is_none() {
                    log::warn!("Categories configuration not loaded");
                }
                Ok((Response::Categories { categories }, None))
            }
            Request::ApplyFilters { .. } => {
                // Content-script message; the background never acts on it.
                Ok((Response::Success { success: false }, None))
            }
        }
    }

    /// Decode, handle, encode.
    pub fn handle_json(&mut self, json: &str) -> Result<(String, Option<Request>), SettingsError> {
        let request = Request::from_json(json)?;
        let (response, forward) = self.handle(request)?;
        Ok((serde_json::to_string(&response)?, forward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    fn background() -> Background<MemoryStore> {
        Background::new(MemoryStore::new(), Some(CategoryCatalog::builtin()))
    }

    #[test]
    fn test_decode_actions() {
        assert_eq!(Request::from_json(r#"{"action":"getFilters"}"#).unwrap(), Request::GetFilters);
        let req = Request::from_json(r#"{"action":"updateFilters","filters":{"keywords":["fed"]}}"#).unwrap();
        match req {
            Request::UpdateFilters { filters } => assert_eq!(filters.keywords, vec!["fed"]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Request::from_json(r#"{"action":"selfDestruct"}"#).is_err());
    }

    #[test]
    fn test_get_filters_before_install() {
        let mut bg = background();
        let (response, forward) = bg.handle(Request::GetFilters).unwrap();
        assert_eq!(response, Response::Filters(FilterConfig::default()));
        assert!(forward.is_none());
    }

    #[test]
    fn test_update_filters_persists_and_forwards() {
        let mut bg = background();
        let filters = FilterConfig {
            keywords: vec!["election".into()],
            ..FilterConfig::default()
        };
        let (response, forward) = bg.handle(Request::UpdateFilters { filters: filters.clone() }).unwrap();
        assert_eq!(response, Response::Success { success: true });
        assert_eq!(forward, Some(Request::ApplyFilters { filters: filters.clone() }));
        assert_eq!(bg.store().load().unwrap().unwrap().filters, filters);
    }

    #[test]
    fn test_invalid_filters_rejected() {
        let mut bg = background();
        let json = r#"{"action":"updateFilters","filters":{"priceRange":{"min":90,"max":10}}}"#;
        assert!(matches!(bg.handle_json(json), Err(SettingsError::Config(_))));
    }

    #[test]
    fn test_response_json_shapes() {
        let mut bg = background();
        let (json, _) = bg.handle_json(r#"{"action":"getSavedFilters"}"#).unwrap();
        assert_eq!(json, "[]");

        let (json, _) = bg
            .handle_json(r#"{"action":"trackMarket","market":{"title":"T","url":"https://x","trackedAt":"2024-05-01T00:00:00Z"}}"#)
            .unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let (json, _) = bg.handle_json(r#"{"action":"getTrackedMarkets"}"#).unwrap();
        assert!(json.contains("\"trackedAt\":\"2024-05-01T00:00:00Z\""));
    }

    #[test]
    fn test_categories_config() {
        let mut bg = background();
        let (response, _) = bg.handle(Request::GetCategoriesConfig).unwrap();
        match response {
            Response::Categories { categories: Some(list) } => assert!(list.iter().any(|c| c.id == "sports")),
            other => panic!("unexpected {:?}", other),
        }

        let mut bare = Background::new(MemoryStore::new(), None);
        let (json, _) = bare.handle_json(r#"{"action":"getCategoriesConfig"}"#).unwrap();
        assert_eq!(json, r#"{"categories":null}"#);
    }

    #[test]
    fn test_save_filter_config() {
        let mut bg = background();
        bg.install_defaults().unwrap();
        let json = r#"{"action":"saveFilterConfig","config":{"name":"Mine","filters":{"keywords":["x"]},"createdAt":"2024-01-01T00:00:00Z"}}"#;
        bg.handle_json(json).unwrap();
        let (response, _) = bg.handle(Request::GetSavedFilters).unwrap();
        match response {
            Response::SavedFilters(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].name, "Mine");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
