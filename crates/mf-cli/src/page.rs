use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use mf_core::{Candidate, CandidateId, CategoryCatalog, FilterConfig, PageDriver};

/// One card as captured from the page: `{"title": ..., "text": ...}`.
#[derive(Debug, Deserialize)]
struct CapturedCard {
    #[serde(default)]
    id: Option<CandidateId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: String,
}

/// Read a captured page: a JSON array of cards.
pub fn read_candidates(path: &Path) -> Result<Vec<Candidate>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let cards: Vec<CapturedCard> = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid page capture '{}': {}", path.display(), e))?;

    Ok(cards
        .into_iter()
        .enumerate()
        .map(|(i, card)| {
            let id = card.id.unwrap_or(i as CandidateId);
            Candidate::new(id, card.title, &card.text)
        })
        .collect())
}

pub fn read_config(path: Option<&str>) -> Result<FilterConfig, String> {
    let Some(path) = path else {
        return Ok(FilterConfig::default());
    };
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    let config: FilterConfig = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid filter config '{}': {}", path, e))?;
    config
        .validate()
        .map_err(|e| format!("Invalid filter config '{}': {}", path, e))?;
    Ok(config)
}

/// Load a catalog file, or the built-in one. A broken file degrades to an
/// empty catalog, as in the extension.
pub fn read_catalog(path: Option<&str>) -> CategoryCatalog {
    match path {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => CategoryCatalog::load_or_empty(&content),
            Err(e) => {
                log::warn!("Failed to read '{}': {}", path, e);
                CategoryCatalog::empty()
            }
        },
        None => CategoryCatalog::builtin(),
    }
}

/// A page backed by a capture file, re-read on every scan.
pub struct FilePage {
    path: PathBuf,
    pub hidden: BTreeSet<CandidateId>,
    pub indicator: Option<usize>,
}

impl FilePage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            hidden: BTreeSet::new(),
            indicator: None,
        }
    }
}

impl PageDriver for FilePage {
    fn enumerate_candidates(&mut self) -> Vec<Candidate> {
        match read_candidates(&self.path) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("{}", e);
                Vec::new()
            }
        }
    }

    fn set_visibility(&mut self, id: CandidateId, visible: bool) {
        if visible {
            self.hidden.remove(&id);
        } else {
            self.hidden.insert(id);
        }
    }

    fn show_indicator(&mut self, hidden_count: usize) {
        self.indicator = Some(hidden_count);
    }

    fn remove_indicator(&mut self) {
        self.indicator = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mf-cli-{}-{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_candidates_assigns_ids_and_lowercases() {
        let path = write_temp(
            "page.json",
            r#"[{"title": "Fed cuts?", "text": "FED CUTS 40% Vol $2M"}, {"text": "orphan"}]"#,
        );
        let candidates = read_candidates(&path).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, 0);
        assert_eq!(candidates[0].text, "fed cuts 40% vol $2m");
        assert!(candidates[1].is_malformed());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_read_config_rejects_inverted_range() {
        let path = write_temp("bad-config.json", r#"{"priceRange": {"min": 80, "max": 20}}"#);
        assert!(read_config(path.to_str()).is_err());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_unreadable_catalog_degrades_to_empty() {
        assert!(read_catalog(Some("/nonexistent/categories.json")).is_empty());
        assert!(!read_catalog(None).is_empty());
    }

    #[test]
    fn test_file_page_tracks_visibility() {
        let mut page = FilePage::new(PathBuf::from("unused.json"));
        page.set_visibility(3, false);
        page.show_indicator(1);
        assert!(page.hidden.contains(&3));
        page.set_visibility(3, true);
        page.remove_indicator();
        assert!(page.hidden.is_empty());
        assert_eq!(page.indicator, None);
    }
}
