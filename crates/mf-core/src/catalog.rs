//! Category Catalog
//!
//! Immutable id -> category mapping loaded once from `categories.json`.
//! Keyword patterns are compiled at load time so the per-candidate hot path
//! only runs substring checks and prebuilt word-boundary regexes.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Catalog that ships with the extension.
pub const BUILTIN_CATEGORIES_JSON: &str = include_str!("../data/categories.json");

/// One category definition as stored in `categories.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    categories: Vec<Category>,
}

/// Error type for catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate category id: {0}")]
    DuplicateId(String),
    #[error("Category at position {0} has an empty id")]
    EmptyId(usize),
    #[error("Keyword '{keyword}' in category '{id}' cannot be compiled: {source}")]
    InvalidKeyword {
        id: String,
        keyword: String,
        #[source]
        source: regex::Error,
    },
}

/// A single include keyword, lowercased, with its word-boundary pattern.
#[derive(Debug, Clone)]
struct KeywordPattern {
    lower: String,
    word: Regex,
}

impl KeywordPattern {
    fn compile(id: &str, keyword: &str) -> Result<Self, CatalogError> {
        let lower = keyword.to_lowercase();
        let word = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&lower))).map_err(|source| {
            CatalogError::InvalidKeyword {
                id: id.to_string(),
                keyword: keyword.to_string(),
                source,
            }
        })?;
        Ok(Self { lower, word })
    }

    fn is_match(&self, text: &str) -> bool {
        text.contains(&self.lower) || self.word.is_match(text)
    }
}

/// A category with its keyword patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledCategory {
    category: Category,
    include: Vec<KeywordPattern>,
    exclude: Vec<String>,
}

impl CompiledCategory {
    fn compile(category: Category) -> Result<Self, CatalogError> {
        let mut include = Vec::with_capacity(category.keywords.len());
        for keyword in &category.keywords {
            if keyword.trim().is_empty() {
                log::warn!("Dropping empty keyword in category '{}'", category.id);
                continue;
            }
            include.push(KeywordPattern::compile(&category.id, keyword)?);
        }

        let exclude = category
            .exclude_keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| k.to_lowercase())
            .collect();

        Ok(Self {
            category,
            include,
            exclude,
        })
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn id(&self) -> &str {
        &self.category.id
    }

    pub fn name(&self) -> &str {
        &self.category.name
    }

    /// Return the first include keyword found in `text`, unless an exclude
    /// keyword is also present. `text` is expected to be lowercased.
    pub fn matched_keyword(&self, text: &str) -> Option<&str> {
        let hit = self.include.iter().find(|k| k.is_match(text))?;
        if let Some(excluded) = self.exclude.iter().find(|k| text.contains(k.as_str())) {
            log::debug!(
                "Category '{}' keyword '{}' suppressed by exclude keyword '{}'",
                self.category.id,
                hit.lower,
                excluded
            );
            return None;
        }
        Some(hit.lower.as_str())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matched_keyword(text).is_some()
    }
}

/// Immutable category lookup table.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    categories: Vec<CompiledCategory>,
    index: HashMap<String, usize>,
}

impl CategoryCatalog {
    /// A catalog with no categories. Category filtering becomes a no-op.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from already-parsed definitions.
    pub fn from_categories(categories: Vec<Category>) -> Result<Self, CatalogError> {
        let mut compiled = Vec::with_capacity(categories.len());
        let mut index = HashMap::with_capacity(categories.len());

        for (pos, category) in categories.into_iter().enumerate() {
            if category.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(pos));
            }
            if index.contains_key(&category.id) {
                return Err(CatalogError::DuplicateId(category.id));
            }
            index.insert(category.id.clone(), compiled.len());
            compiled.push(CompiledCategory::compile(category)?);
        }

        Ok(Self {
            categories: compiled,
            index,
        })
    }

    /// Parse `{"categories": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_categories(file.categories)
    }

    /// Parse a catalog, degrading to an empty one on any failure.
    pub fn load_or_empty(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(catalog) => {
                log::info!("Loaded categories configuration: {} categories", catalog.len());
                catalog
            }
            Err(e) => {
                log::warn!("Error loading categories configuration: {}", e);
                Self::empty()
            }
        }
    }

    /// The catalog bundled with the crate.
    pub fn builtin() -> Self {
        Self::load_or_empty(BUILTIN_CATEGORIES_JSON)
    }

    pub fn lookup(&self, id: &str) -> Option<&CompiledCategory> {
        self.index.get(id).map(|&i| &self.categories[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledCategory> {
        self.categories.iter()
    }

    /// Definitions in load order, as sent to the popup.
    pub fn definitions(&self) -> Vec<Category> {
        self.categories.iter().map(|c| c.category.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
