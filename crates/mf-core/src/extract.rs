//! Field Extraction
//!
//! Market cards carry no structured data attributes, so price, volume and
//! liquidity are scraped from the rendered text. A pattern that does not
//! match yields `None` and the corresponding filter stage is skipped.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::ExtractedFields;

// =============================================================================
// Extractor Trait
// =============================================================================

/// Source of numeric signals for one candidate.
pub trait FieldExtractor {
    fn extract_price(&self, text: &str) -> Option<f64>;
    fn extract_volume(&self, text: &str) -> Option<f64>;
    fn extract_liquidity(&self, text: &str) -> Option<f64>;

    fn extract(&self, text: &str) -> ExtractedFields {
        ExtractedFields {
            price: self.extract_price(text),
            volume_usd: self.extract_volume(text),
            liquidity_usd: self.extract_liquidity(text),
        }
    }
}

/// Scrapes fields from flattened card text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl FieldExtractor for TextExtractor {
    fn extract_price(&self, text: &str) -> Option<f64> {
        extract_price(text)
    }

    fn extract_volume(&self, text: &str) -> Option<f64> {
        extract_volume(text)
    }

    fn extract_liquidity(&self, text: &str) -> Option<f64> {
        extract_liquidity(text)
    }
}

/// Ignores the text and returns values known ahead of time, e.g. from an
/// API response.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedFields(pub ExtractedFields);

impl FieldExtractor for FixedFields {
    fn extract_price(&self, _text: &str) -> Option<f64> {
        self.0.price
    }

    fn extract_volume(&self, _text: &str) -> Option<f64> {
        self.0.volume_usd
    }

    fn extract_liquidity(&self, _text: &str) -> Option<f64> {
        self.0.liquidity_usd
    }
}

// =============================================================================
// Patterns
// =============================================================================

fn price_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$?(\d+(?:\.\d+)?)\s*%?").expect("static price pattern"))
}

fn volume_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)volume\s*\$?(\d+(?:\.\d+)?)([kmb])?").expect("static volume pattern")
    })
}

fn liquidity_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)liquidity\s*\$?(\d+(?:\.\d+)?)([kmb])?").expect("static liquidity pattern")
    })
}

/// Scale factor for a K/M/B suffix.
pub fn magnitude(suffix: char) -> Option<f64> {
    match suffix.to_ascii_lowercase() {
        'k' => Some(1e3),
        'm' => Some(1e6),
        'b' => Some(1e9),
        _ => None,
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// First number in the text, optionally adorned with `$` or `%`.
///
/// This takes the first numeric token anywhere in the card, which may be an
/// unrelated figure that precedes the actual price.
pub fn extract_price(text: &str) -> Option<f64> {
    let caps = price_pattern().captures(text)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Value following the "volume" label, scaled by its magnitude suffix.
pub fn extract_volume(text: &str) -> Option<f64> {
    extract_labeled(volume_pattern(), text)
}

/// Value following the "liquidity" label, scaled by its magnitude suffix.
pub fn extract_liquidity(text: &str) -> Option<f64> {
    extract_labeled(liquidity_pattern(), text)
}

fn extract_labeled(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let scale = caps
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .and_then(magnitude)
        .unwrap_or(1.0);
    Some(value * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_volume() {
        assert_eq!(extract_volume("Volume $1.5M"), Some(1_500_000.0));
        assert_eq!(extract_volume("Volume $200K"), Some(200_000.0));
        assert_eq!(extract_volume("no volume info"), None);
    }

    #[test]
    fn test_extract_volume_lowercased_text() {
        assert_eq!(extract_volume("12% chance volume $3.2m"), Some(3_200_000.0));
        assert_eq!(extract_volume("volume 2b"), Some(2_000_000_000.0));
        assert_eq!(extract_volume("volume $950"), Some(950.0));
    }

    #[test]
    fn test_extract_liquidity() {
        assert_eq!(extract_liquidity("Liquidity $45.5k"), Some(45_500.0));
        assert_eq!(extract_liquidity("liquidity:"), None);
        assert_eq!(extract_liquidity("volume $10k"), None);
    }

    #[test]
    fn test_extract_price() {
        assert_eq!(extract_price("Price: 42%"), Some(42.0));
        assert_eq!(extract_price("yes 63.5%"), Some(63.5));
        assert_eq!(extract_price("$0.75"), Some(0.75));
        assert_eq!(extract_price("no numbers here"), None);
    }

    #[test]
    fn test_extract_price_takes_first_number() {
        // The first numeric token wins even when it is not the price.
        assert_eq!(extract_price("2028 election 35% chance"), Some(2028.0));
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(magnitude('K'), Some(1e3));
        assert_eq!(magnitude('m'), Some(1e6));
        assert_eq!(magnitude('B'), Some(1e9));
        assert_eq!(magnitude('x'), None);
    }

    #[test]
    fn test_text_extractor_all_fields() {
        let fields = TextExtractor.extract("fed cuts? 18% volume $2.1m liquidity $300k");
        assert_eq!(fields.price, Some(18.0));
        assert_eq!(fields.volume_usd, Some(2_100_000.0));
        assert_eq!(fields.liquidity_usd, Some(300_000.0));
    }

    #[test]
    fn test_fixed_fields_ignore_text() {
        let fixed = FixedFields(ExtractedFields {
            price: Some(10.0),
            volume_usd: None,
            liquidity_usd: Some(5.0),
        });
        let fields = fixed.extract("volume $1m");
        assert_eq!(fields.price, Some(10.0));
        assert_eq!(fields.volume_usd, None);
        assert_eq!(fields.liquidity_usd, Some(5.0));
    }
}
