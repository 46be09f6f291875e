//! Filter Rule Evaluation
//!
//! A compound predicate over one candidate. Stages run in a fixed order and
//! the first stage that fires decides: category, keyword, price range,
//! volume threshold, liquidity threshold. A stage only runs when its part of
//! the config is armed, and a stage that needs an extracted field never fires
//! when that field is missing.

use std::borrow::Cow;

use serde::Serialize;

use crate::catalog::CategoryCatalog;
use crate::types::{ExtractedFields, FilterConfig};

bitflags::bitflags! {
    /// Stages armed by a config.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActiveStages: u8 {
        const CATEGORY = 1 << 0;
        const KEYWORD = 1 << 1;
        const PRICE = 1 << 2;
        const VOLUME = 1 << 3;
        const LIQUIDITY = 1 << 4;
    }
}

impl ActiveStages {
    /// Compute armed stages. A disabled config arms nothing.
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut stages = Self::empty();
        if !config.enabled {
            return stages;
        }
        if !config.categories.is_empty() {
            stages |= Self::CATEGORY;
        }
        if !config.keywords.is_empty() {
            stages |= Self::KEYWORD;
        }
        if config.price_range.is_active() {
            stages |= Self::PRICE;
        }
        if config.volume_threshold > 0.0 {
            stages |= Self::VOLUME;
        }
        if config.liquidity_threshold > 0.0 {
            stages |= Self::LIQUIDITY;
        }
        stages
    }

    /// Stages that need a numeric field scraped from the text.
    pub fn needs_fields(&self) -> bool {
        self.intersects(Self::PRICE | Self::VOLUME | Self::LIQUIDITY)
    }
}

/// Why a candidate was hidden.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum FilterReason {
    Category { id: String, keyword: String },
    Keyword { keyword: String },
    PriceOutOfRange { price: f64 },
    VolumeBelow { volume: f64 },
    LiquidityBelow { liquidity: f64 },
}

impl std::fmt::Display for FilterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Category { id, keyword } => write!(f, "category '{}' (keyword '{}')", id, keyword),
            Self::Keyword { keyword } => write!(f, "keyword '{}'", keyword),
            Self::PriceOutOfRange { price } => write!(f, "price {} out of range", price),
            Self::VolumeBelow { volume } => write!(f, "volume {} below threshold", volume),
            Self::LiquidityBelow { liquidity } => write!(f, "liquidity {} below threshold", liquidity),
        }
    }
}

/// Decide whether a candidate should be hidden. `text` is the flattened card
/// text; matching ignores case.
pub fn should_filter(
    text: &str,
    fields: &ExtractedFields,
    config: &FilterConfig,
    catalog: &CategoryCatalog,
) -> bool {
    explain(text, fields, config, catalog).is_some()
}

/// Like [`should_filter`] but reports the stage that fired.
pub fn explain(
    text: &str,
    fields: &ExtractedFields,
    config: &FilterConfig,
    catalog: &CategoryCatalog,
) -> Option<FilterReason> {
    let stages = ActiveStages::from_config(config);
    if stages.is_empty() {
        return None;
    }

    let text = lowercase(text);
    let text = text.as_ref();

    if stages.contains(ActiveStages::CATEGORY) {
        if let Some(reason) = match_category(text, config, catalog) {
            return Some(reason);
        }
    }

    if stages.contains(ActiveStages::KEYWORD) {
        if let Some(reason) = match_keyword(text, config) {
            return Some(reason);
        }
    }

    if stages.contains(ActiveStages::PRICE) {
        if let Some(price) = fields.price {
            if config.price_range.excludes(price) {
                log::debug!("Market filtered due to price range: {}", price);
                return Some(FilterReason::PriceOutOfRange { price });
            }
        }
    }

    if stages.contains(ActiveStages::VOLUME) {
        if let Some(volume) = fields.volume_usd {
            if volume < config.volume_threshold {
                log::debug!("Market filtered due to volume threshold: {}", volume);
                return Some(FilterReason::VolumeBelow { volume });
            }
        }
    }

    if stages.contains(ActiveStages::LIQUIDITY) {
        if let Some(liquidity) = fields.liquidity_usd {
            if liquidity < config.liquidity_threshold {
                log::debug!("Market filtered due to liquidity threshold: {}", liquidity);
                return Some(FilterReason::LiquidityBelow { liquidity });
            }
        }
    }

    None
}

fn match_category(text: &str, config: &FilterConfig, catalog: &CategoryCatalog) -> Option<FilterReason> {
    for id in &config.categories {
        let Some(category) = catalog.lookup(id) else {
            log::debug!("Category configuration not found for: {}", id);
            continue;
        };
        if let Some(keyword) = category.matched_keyword(text) {
            log::debug!("Market matches keyword '{}' for category '{}'", keyword, category.name());
            return Some(FilterReason::Category {
                id: id.clone(),
                keyword: keyword.to_string(),
            });
        }
    }
    None
}

/// Borrow `text` when it has no uppercase characters.
fn lowercase(text: &str) -> Cow<'_, str> {
    if text.chars().any(char::is_uppercase) {
        Cow::Owned(text.to_lowercase())
    } else {
        Cow::Borrowed(text)
    }
}

fn match_keyword(text: &str, config: &FilterConfig) -> Option<FilterReason> {
    config
        .keywords
        .iter()
        .filter(|k| !k.is_empty())
        .find(|k| text.contains(lowercase(k).as_ref()))
        .map(|k| {
            log::debug!("Market matches keyword '{}'", k);
            FilterReason::Keyword { keyword: k.clone() }
        })
}
