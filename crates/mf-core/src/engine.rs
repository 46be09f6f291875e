//! Filter Engine
//!
//! Runs the rule over every candidate of one scan and aggregates the result.
//! Candidates are independent; a candidate that cannot be evaluated stays
//! visible and never aborts the pass.

use serde::Serialize;

use crate::catalog::CategoryCatalog;
use crate::extract::{FieldExtractor, TextExtractor};
use crate::rule::{explain, ActiveStages, FilterReason};
use crate::types::{Candidate, CandidateId, ExtractedFields, FilterConfig};

// =============================================================================
// Results
// =============================================================================

/// Decision for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: CandidateId,
    /// true = hide
    pub hide: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FilterReason>,
}

/// Outcome of one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// One entry per candidate, in input order.
    pub decisions: Vec<Decision>,
    pub hidden_count: usize,
    pub scanned: usize,
    /// Candidates skipped for lack of a title.
    pub malformed: usize,
}

impl ScanReport {
    pub fn decision_for(&self, id: CandidateId) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.id == id)
    }

    pub fn is_hidden(&self, id: CandidateId) -> bool {
        self.decision_for(id).map_or(false, |d| d.hide)
    }
}

// =============================================================================
// Page Driver
// =============================================================================

/// The rendering side of a page: where candidates come from and where
/// visibility decisions go.
pub trait PageDriver {
    /// Current set of elements considered markets.
    fn enumerate_candidates(&mut self) -> Vec<Candidate>;

    /// Show or hide one candidate.
    fn set_visibility(&mut self, id: CandidateId, visible: bool);

    /// Show "N markets filtered", creating the indicator if needed.
    fn show_indicator(&mut self, hidden_count: usize);

    fn remove_indicator(&mut self);
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless evaluator, generic over how fields are extracted.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine<E = TextExtractor> {
    extractor: E,
}

impl FilterEngine<TextExtractor> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: FieldExtractor> FilterEngine<E> {
    pub fn with_extractor(extractor: E) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Decide for a single candidate.
    pub fn decide(&self, candidate: &Candidate, config: &FilterConfig, catalog: &CategoryCatalog) -> Decision {
        let visible = Decision {
            id: candidate.id,
            hide: false,
            reason: None,
        };

        if candidate.is_malformed() {
            log::warn!("No title element found for market card #{}", candidate.id);
            return visible;
        }

        let stages = ActiveStages::from_config(config);
        if stages.is_empty() {
            return visible;
        }

        let fields = if stages.needs_fields() {
            self.extractor.extract(&candidate.text)
        } else {
            ExtractedFields::default()
        };

        let reason = explain(&candidate.text, &fields, config, catalog);
        Decision {
            id: candidate.id,
            hide: reason.is_some(),
            reason,
        }
    }

    /// Evaluate a whole scan. Pure: same inputs, same report.
    pub fn evaluate(&self, candidates: &[Candidate], config: &FilterConfig, catalog: &CategoryCatalog) -> ScanReport {
        let mut report = ScanReport {
            decisions: Vec::with_capacity(candidates.len()),
            scanned: candidates.len(),
            ..ScanReport::default()
        };

        for candidate in candidates {
            if candidate.is_malformed() {
                report.malformed += 1;
            }
            let decision = self.decide(candidate, config, catalog);
            if decision.hide {
                report.hidden_count += 1;
            }
            report.decisions.push(decision);
        }

        log::debug!(
            "Filtered {} of {} markets ({} without title)",
            report.hidden_count,
            report.scanned,
            report.malformed
        );
        report
    }

    /// Scan a page, push visibility, and refresh the indicator.
    ///
    /// With filtering disabled every candidate is restored and the indicator
    /// removed.
    pub fn apply<P: PageDriver + ?Sized>(
        &self,
        page: &mut P,
        config: &FilterConfig,
        catalog: &CategoryCatalog,
    ) -> ScanReport {
        let candidates = page.enumerate_candidates();

        if !config.enabled {
            log::debug!("Filters disabled, restoring {} markets", candidates.len());
            for candidate in &candidates {
                page.set_visibility(candidate.id, true);
            }
            page.remove_indicator();
            return self.evaluate(&candidates, config, catalog);
        }

        let report = self.evaluate(&candidates, config, catalog);
        if report.scanned == 0 {
            return report;
        }

        for decision in &report.decisions {
            page.set_visibility(decision.id, !decision.hide);
        }
        page.show_indicator(report.hidden_count);
        report
    }
}

/// Evaluate with the default text extractor.
pub fn evaluate(candidates: &[Candidate], config: &FilterConfig, catalog: &CategoryCatalog) -> ScanReport {
    FilterEngine::new().evaluate(candidates, config, catalog)
}
