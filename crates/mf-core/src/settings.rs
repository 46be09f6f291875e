//! Persisted Settings
//!
//! The writable side of the filter config plus saved presets and tracked
//! markets. This is the only place a `FilterConfig` is mutated; the engine
//! receives clones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConfigError, FilterConfig};

/// Named filter preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilterConfig {
    pub name: String,
    pub filters: FilterConfig,
    pub created_at: DateTime<Utc>,
}

/// Bookmarked market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedMarket {
    pub title: String,
    #[serde(default)]
    pub price: Option<String>,
    pub url: String,
    pub tracked_at: DateTime<Utc>,
}

/// Everything the extension keeps in synced storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionSettings {
    pub filters: FilterConfig,
    pub saved_filters: Vec<SavedFilterConfig>,
    pub tracked_markets: Vec<TrackedMarket>,
}

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid filter config: {0}")]
    Config(#[from] ConfigError),
    #[error("No {kind} at index {index} (have {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Name must not be empty")]
    EmptyName,
    #[error("Storage error: {0}")]
    Store(String),
}

fn check_index(kind: &'static str, index: usize, len: usize) -> Result<(), SettingsError> {
    if index < len {
        Ok(())
    } else {
        Err(SettingsError::IndexOutOfRange { kind, index, len })
    }
}

impl ExtensionSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace the active config after validating it.
    pub fn update_filters(&mut self, filters: FilterConfig) -> Result<(), SettingsError> {
        filters.validate()?;
        self.filters = filters;
        Ok(())
    }

    /// Add a keyword. Returns false if it was blank or already present.
    pub fn add_keyword(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        if keyword.is_empty() || self.filters.keywords.iter().any(|k| k == keyword) {
            return false;
        }
        log::debug!("Adding keyword: {}", keyword);
        self.filters.keywords.push(keyword.to_string());
        true
    }

    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        let before = self.filters.keywords.len();
        self.filters.keywords.retain(|k| k != keyword);
        before != self.filters.keywords.len()
    }

    /// Check or uncheck a category. Returns whether it is now selected.
    pub fn toggle_category(&mut self, id: &str) -> bool {
        if let Some(pos) = self.filters.categories.iter().position(|c| c == id) {
            self.filters.categories.remove(pos);
            log::debug!("Categories removed: {}", id);
            false
        } else {
            self.filters.categories.push(id.to_string());
            log::debug!("Categories added: {}", id);
            true
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.filters.enabled = enabled;
    }

    /// Snapshot the active config under `name`.
    pub fn save_preset(&mut self, name: &str, created_at: DateTime<Utc>) -> Result<&SavedFilterConfig, SettingsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsError::EmptyName);
        }
        log::debug!("Saving filter configuration: {}", name);
        self.saved_filters.push(SavedFilterConfig {
            name: name.to_string(),
            filters: self.filters.clone(),
            created_at,
        });
        Ok(&self.saved_filters[self.saved_filters.len() - 1])
    }

    /// Append an already-built preset (from the popup).
    pub fn push_preset(&mut self, preset: SavedFilterConfig) -> Result<(), SettingsError> {
        if preset.name.trim().is_empty() {
            return Err(SettingsError::EmptyName);
        }
        preset.filters.validate()?;
        self.saved_filters.push(preset);
        Ok(())
    }

    /// Make a saved preset the active config.
    pub fn apply_preset(&mut self, index: usize) -> Result<&FilterConfig, SettingsError> {
        check_index("saved filter", index, self.saved_filters.len())?;
        let preset = &self.saved_filters[index];
        log::debug!("Applying saved filter: {}", preset.name);
        self.filters = preset.filters.clone();
        Ok(&self.filters)
    }

    pub fn delete_preset(&mut self, index: usize) -> Result<SavedFilterConfig, SettingsError> {
        check_index("saved filter", index, self.saved_filters.len())?;
        let removed = self.saved_filters.remove(index);
        log::debug!("Deleting saved filter: {}", removed.name);
        Ok(removed)
    }

    pub fn track_market(&mut self, market: TrackedMarket) {
        log::debug!("Tracking market: {}", market.title);
        self.tracked_markets.push(market);
    }

    pub fn delete_tracked_market(&mut self, index: usize) -> Result<TrackedMarket, SettingsError> {
        check_index("tracked market", index, self.tracked_markets.len())?;
        let removed = self.tracked_markets.remove(index);
        log::debug!("Deleting tracked market: {}", removed.title);
        Ok(removed)
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Where settings live between sessions.
pub trait SettingsStore {
    /// Stored settings, or `None` before first install.
    fn load(&self) -> Result<Option<ExtensionSettings>, SettingsError>;
    fn save(&mut self, settings: &ExtensionSettings) -> Result<(), SettingsError>;

    /// Stored settings, falling back to install defaults.
    fn load_or_default(&self) -> Result<ExtensionSettings, SettingsError> {
        Ok(self.load()?.unwrap_or_default())
    }
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    settings: Option<ExtensionSettings>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ExtensionSettings) -> Self {
        Self {
            settings: Some(settings),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<ExtensionSettings>, SettingsError> {
        Ok(self.settings.clone())
    }

    fn save(&mut self, settings: &ExtensionSettings) -> Result<(), SettingsError> {
        self.settings = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceRange;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_add_keyword_dedupes_and_trims() {
        let mut settings = ExtensionSettings::default();
        assert!(settings.add_keyword("  election "));
        assert!(!settings.add_keyword("election"));
        assert!(!settings.add_keyword("   "));
        assert_eq!(settings.filters.keywords, vec!["election"]);
        assert!(settings.remove_keyword("election"));
        assert!(!settings.remove_keyword("election"));
    }

    #[test]
    fn test_toggle_category() {
        let mut settings = ExtensionSettings::default();
        assert!(settings.toggle_category("sports"));
        assert!(settings.toggle_category("crypto"));
        assert!(!settings.toggle_category("sports"));
        assert_eq!(settings.filters.categories, vec!["crypto"]);
    }

    #[test]
    fn test_update_filters_validates() {
        let mut settings = ExtensionSettings::default();
        let bad = FilterConfig {
            price_range: PriceRange { min: 80.0, max: 20.0 },
            ..FilterConfig::default()
        };
        assert!(matches!(settings.update_filters(bad), Err(SettingsError::Config(_))));
        assert_eq!(settings.filters, FilterConfig::default());
    }

    #[test]
    fn test_presets_snapshot_and_apply() {
        let mut settings = ExtensionSettings::default();
        settings.add_keyword("election");
        settings.save_preset("No politics", at(1_700_000_000)).unwrap();

        settings.add_keyword("bitcoin");
        assert_eq!(settings.saved_filters[0].filters.keywords, vec!["election"]);

        let applied = settings.apply_preset(0).unwrap();
        assert_eq!(applied.keywords, vec!["election"]);
        assert!(matches!(
            settings.apply_preset(3),
            Err(SettingsError::IndexOutOfRange { index: 3, len: 1, .. })
        ));

        assert!(matches!(settings.save_preset(" ", at(0)), Err(SettingsError::EmptyName)));
        let removed = settings.delete_preset(0).unwrap();
        assert_eq!(removed.name, "No politics");
        assert!(settings.saved_filters.is_empty());
    }

    #[test]
    fn test_tracked_markets() {
        let mut settings = ExtensionSettings::default();
        settings.track_market(TrackedMarket {
            title: "Fed cut in June?".into(),
            price: Some("34%".into()),
            url: "https://polymarket.com/event/fed-june".into(),
            tracked_at: at(1_700_000_000),
        });
        assert_eq!(settings.tracked_markets.len(), 1);
        assert!(settings.delete_tracked_market(1).is_err());
        assert_eq!(settings.delete_tracked_market(0).unwrap().title, "Fed cut in June?");
    }

    #[test]
    fn test_storage_json_shape() {
        let mut settings = ExtensionSettings::default();
        settings.save_preset("p", at(0)).unwrap();
        let json = settings.to_json().unwrap();
        assert!(json.contains("\"savedFilters\""));
        assert!(json.contains("\"trackedMarkets\""));
        assert!(json.contains("\"createdAt\": \"1970-01-01T00:00:00Z\""));

        let back = ExtensionSettings::from_json(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_memory_store_defaults() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.load_or_default().unwrap(), ExtensionSettings::default());

        let mut settings = ExtensionSettings::default();
        settings.set_enabled(false);
        store.save(&settings).unwrap();
        assert!(!store.load_or_default().unwrap().filters.enabled);
    }
}
