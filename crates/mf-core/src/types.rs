//! Core type definitions for MarketFilter
//!
//! These types map directly to the extension's storage JSON and are
//! passed by value (or shared reference) into every evaluation pass.

use serde::{Deserialize, Serialize};

// =============================================================================
// Filter Config
// =============================================================================

/// Lowest price a market can show, in percent.
pub const PRICE_FLOOR: f64 = 0.0;
/// Highest price a market can show, in percent.
pub const PRICE_CEILING: f64 = 100.0;

/// Inclusive price window, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// True when the window is narrower than the full 0..100 range.
    pub fn is_active(&self) -> bool {
        self.min > PRICE_FLOOR || self.max < PRICE_CEILING
    }

    /// True when `price` falls outside the window.
    pub fn excludes(&self, price: f64) -> bool {
        price < self.min || price > self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: PRICE_FLOOR,
            max: PRICE_CEILING,
        }
    }
}

/// Snapshot of the active filtering rules for one evaluation pass.
///
/// The settings layer owns the writable copy; the engine only ever sees
/// a shared reference. `min <= max` is not enforced here, run
/// [`FilterConfig::validate`] before accepting user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    /// Hide markets whose text contains any of these.
    pub keywords: Vec<String>,
    /// Hide markets matching any of these category ids.
    pub categories: Vec<String>,
    pub price_range: PriceRange,
    /// Hide markets with scraped volume below this (USD). 0 disables.
    pub volume_threshold: f64,
    /// Hide markets with scraped liquidity below this (USD). 0 disables.
    pub liquidity_threshold: f64,
    /// Global switch. When false nothing is hidden.
    pub enabled: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            categories: Vec::new(),
            price_range: PriceRange::default(),
            volume_threshold: 0.0,
            liquidity_threshold: 0.0,
            enabled: true,
        }
    }
}

/// Error type for config validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Price bound {0} is outside 0..=100")]
    PriceOutOfBounds(f64),
    #[error("Price range is inverted: min={min}, max={max}")]
    InvertedPriceRange { min: f64, max: f64 },
    #[error("Threshold '{name}' must be >= 0, got {value}")]
    NegativeThreshold { name: &'static str, value: f64 },
    #[error("Field '{0}' is not a finite number")]
    NonFinite(&'static str),
}

impl FilterConfig {
    /// Check the numeric invariants the UI is expected to uphold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let numbers = [
            ("priceRange.min", self.price_range.min),
            ("priceRange.max", self.price_range.max),
            ("volumeThreshold", self.volume_threshold),
            ("liquidityThreshold", self.liquidity_threshold),
        ];
        for (name, value) in numbers {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }

        for bound in [self.price_range.min, self.price_range.max] {
            if !(PRICE_FLOOR..=PRICE_CEILING).contains(&bound) {
                return Err(ConfigError::PriceOutOfBounds(bound));
            }
        }

        if self.price_range.min > self.price_range.max {
            return Err(ConfigError::InvertedPriceRange {
                min: self.price_range.min,
                max: self.price_range.max,
            });
        }

        if self.volume_threshold < 0.0 {
            return Err(ConfigError::NegativeThreshold {
                name: "volumeThreshold",
                value: self.volume_threshold,
            });
        }
        if self.liquidity_threshold < 0.0 {
            return Err(ConfigError::NegativeThreshold {
                name: "liquidityThreshold",
                value: self.liquidity_threshold,
            });
        }

        Ok(())
    }
}

// =============================================================================
// Candidates
// =============================================================================

/// Page-local handle for a candidate element. Only meaningful within one scan.
pub type CandidateId = u32;

/// One page element believed to represent a market listing.
///
/// Construct with [`Candidate::new`], which lowercases `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    /// Text of the title element, if one was found.
    pub title: Option<String>,
    /// Flattened text content of the whole element, lowercased.
    pub text: String,
}

impl Candidate {
    /// Build a candidate, lowercasing the flattened text.
    pub fn new(id: CandidateId, title: Option<String>, text: &str) -> Self {
        Self {
            id,
            title,
            text: text.to_lowercase(),
        }
    }

    /// A candidate without a usable title cannot be evaluated.
    pub fn is_malformed(&self) -> bool {
        self.title.as_deref().map_or(true, |t| t.trim().is_empty())
    }
}

// =============================================================================
// Extracted Fields
// =============================================================================

/// Numeric signals scraped from one candidate. `None` means "could not read",
/// never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub price: Option<f64>,
    pub volume_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
}
