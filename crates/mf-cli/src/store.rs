use std::fs;
use std::path::PathBuf;

use mf_core::settings::{ExtensionSettings, SettingsError, SettingsStore};

/// Settings kept in a JSON file with the extension's storage layout.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<ExtensionSettings>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SettingsError::Store(format!("Failed to read '{}': {}", self.path.display(), e)))?;
        ExtensionSettings::from_json(&content).map(Some)
    }

    fn save(&mut self, settings: &ExtensionSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| SettingsError::Store(format!("Failed to create '{}': {}", parent.display(), e)))?;
        }
        fs::write(&self.path, settings.to_json()?)
            .map_err(|e| SettingsError::Store(format!("Failed to write '{}': {}", self.path.display(), e)))
    }
}
