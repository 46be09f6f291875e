//! Page profile: how market cards are located on the host site.
//!
//! Selectors are best-effort and follow the site's current markup. They are
//! data, not code, so a layout change only needs a new profile.

use serde::{Deserialize, Serialize};

use crate::watcher::{InsertedNode, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageProfile {
    /// Any element matching one of these is a candidate.
    pub candidate_selectors: Vec<String>,
    /// First match inside a candidate is its title.
    pub title_selector: String,
    /// Class names that mark an inserted node as a candidate itself.
    pub marker_classes: Vec<String>,
    /// Class of the "N markets filtered" badge.
    pub indicator_class: String,
    pub retry: RetryPolicy,
}

impl Default for PageProfile {
    fn default() -> Self {
        Self {
            candidate_selectors: vec![
                ".c-dhzjXW.c-dhzjXW-idNOCmT-css".into(),
                "[data-testid=\"market-card\"]".into(),
                ".market-card".into(),
                "[class*=\"MarketCard\"]".into(),
            ],
            title_selector: "h3, h4, [class*=\"Title\"], div".into(),
            marker_classes: vec!["c-dhzjXW".into(), "market-card".into()],
            indicator_class: "polymarket-filter-indicator".into(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PageProfile {
    /// Candidate selectors joined into one selector group.
    pub fn candidate_selector(&self) -> String {
        self.candidate_selectors.join(", ")
    }

    /// Does this insertion warrant a new pass?
    pub fn qualifies(&self, node: &InsertedNode) -> bool {
        if !node.is_element {
            return false;
        }
        node.contains_candidate
            || node
                .classes
                .iter()
                .any(|c| self.marker_classes.iter().any(|m| m == c))
    }

    /// Text of the indicator badge.
    pub fn indicator_text(hidden_count: usize) -> String {
        format!("{} markets filtered", hidden_count)
    }
}
