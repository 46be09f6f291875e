//! Filter Session
//!
//! Per-page driver state: the catalog, the latest config snapshot, the
//! watcher, and the last scan report. Hosts forward events and timer ticks;
//! the session decides when to scan and applies results through a
//! [`PageDriver`].

use crate::catalog::CategoryCatalog;
use crate::engine::{FilterEngine, PageDriver, ScanReport};
use crate::extract::{FieldExtractor, TextExtractor};
use crate::profile::PageProfile;
use crate::types::FilterConfig;
use crate::watcher::{ChangeWatcher, InsertedNode, PassOutcome, Trigger};

pub struct FilterSession<E = TextExtractor> {
    engine: FilterEngine<E>,
    catalog: CategoryCatalog,
    config: FilterConfig,
    profile: PageProfile,
    watcher: ChangeWatcher,
    last_report: Option<ScanReport>,
}

impl FilterSession<TextExtractor> {
    pub fn new(catalog: CategoryCatalog, config: FilterConfig, profile: PageProfile) -> Self {
        Self::with_engine(FilterEngine::new(), catalog, config, profile)
    }
}

impl<E: FieldExtractor> FilterSession<E> {
    pub fn with_engine(
        engine: FilterEngine<E>,
        catalog: CategoryCatalog,
        config: FilterConfig,
        profile: PageProfile,
    ) -> Self {
        let watcher = ChangeWatcher::new(profile.retry);
        Self {
            engine,
            catalog,
            config,
            profile,
            watcher,
            last_report: None,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn profile(&self) -> &PageProfile {
        &self.profile
    }

    pub fn last_report(&self) -> Option<&ScanReport> {
        self.last_report.as_ref()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.watcher.next_deadline()
    }

    /// Content script injected. Schedule the initial delayed pass.
    pub fn start(&mut self, now_ms: u64) -> u64 {
        self.watcher.schedule(now_ms, Trigger::PageLoad)
    }

    /// Swap in a new config snapshot. Disabling restores the page at once;
    /// anything else schedules a pass.
    pub fn update_config<P: PageDriver + ?Sized>(&mut self, now_ms: u64, config: FilterConfig, page: &mut P) {
        log::debug!("Received new filters: {:?}", config);
        self.config = config;
        if self.config.enabled {
            self.watcher.schedule(now_ms, Trigger::RulesUpdated);
        } else {
            self.watcher.cancel();
            self.last_report = Some(self.engine.apply(page, &self.config, &self.catalog));
        }
    }

    /// Flip the global switch (indicator click). Returns the new snapshot so
    /// the caller can persist it.
    pub fn toggle_enabled<P: PageDriver + ?Sized>(&mut self, now_ms: u64, page: &mut P) -> FilterConfig {
        let mut config = self.config.clone();
        config.enabled = !config.enabled;
        log::debug!("Filter toggle clicked, enabled: {}", config.enabled);
        self.update_config(now_ms, config.clone(), page);
        config
    }

    /// Feed a batch of inserted nodes. Returns true if a pass was scheduled.
    pub fn on_insertions(&mut self, now_ms: u64, nodes: &[InsertedNode]) -> bool {
        if !nodes.iter().any(|n| self.profile.qualifies(n)) {
            return false;
        }
        log::debug!("Detected DOM changes, reapplying filters");
        self.watcher.schedule(now_ms, Trigger::Mutation);
        true
    }

    /// Run the pending pass if it is due.
    pub fn tick<P: PageDriver + ?Sized>(&mut self, now_ms: u64, page: &mut P) -> Option<ScanReport> {
        let ticket = self.watcher.take_due(now_ms)?;
        let report = self.engine.apply(page, &self.config, &self.catalog);

        if self.config.enabled {
            log::debug!("Found {} market cards", report.scanned);
            if let PassOutcome::Superseded = self.watcher.complete(ticket, now_ms, report.scanned) {
                log::debug!("Pass superseded by a newer trigger");
            }
        } else {
            self.watcher.settle(ticket);
        }

        self.last_report = Some(report.clone());
        Some(report)
    }

    /// Run a pass right now, ignoring the schedule.
    pub fn apply_now<P: PageDriver + ?Sized>(&mut self, page: &mut P) -> ScanReport {
        self.watcher.cancel();
        let report = self.engine.apply(page, &self.config, &self.catalog);
        self.last_report = Some(report.clone());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::FakePage;

    fn session(keyword: &str) -> FilterSession {
        let config = FilterConfig {
            keywords: vec![keyword.to_string()],
            ..FilterConfig::default()
        };
        FilterSession::new(CategoryCatalog::empty(), config, PageProfile::default())
    }

    #[test]
    fn test_initial_pass_runs_after_delay() {
        let mut page = FakePage::with_texts(&["Election A", "Weather B"]);
        let mut s = session("election");
        assert_eq!(s.start(0), 1000);
        assert!(s.tick(500, &mut page).is_none());
        let report = s.tick(1000, &mut page).unwrap();
        assert_eq!(report.hidden_count, 1);
        assert_eq!(page.indicator, Some(1));
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_empty_page_retries_then_gives_up() {
        let mut page = FakePage::default();
        let mut s = session("election");
        s.start(0);
        s.tick(1000, &mut page).unwrap();
        assert_eq!(s.next_deadline(), Some(2000));
        s.tick(2000, &mut page).unwrap();
        assert_eq!(s.next_deadline(), None);
        assert_eq!(page.enumerations, 2);
    }

    #[test]
    fn test_late_cards_picked_up_on_retry() {
        let mut page = FakePage::default();
        let mut s = session("election");
        s.start(0);
        s.tick(1000, &mut page);
        page = FakePage::with_texts(&["Election night"]);
        let report = s.tick(2000, &mut page).unwrap();
        assert_eq!(report.hidden_count, 1);
    }

    #[test]
    fn test_qualifying_insertion_schedules_pass() {
        let mut s = session("election");
        assert!(!s.on_insertions(0, &[InsertedNode::element(["tooltip"])]));
        assert_eq!(s.next_deadline(), None);
        assert!(s.on_insertions(0, &[InsertedNode::element(["market-card"])]));
        assert_eq!(s.next_deadline(), Some(500));
    }

    #[test]
    fn test_disable_restores_immediately() {
        let mut page = FakePage::with_texts(&["Election A"]);
        let mut s = session("election");
        s.apply_now(&mut page);
        assert_eq!(page.hidden.len(), 1);

        let toggled = s.toggle_enabled(10, &mut page);
        assert!(!toggled.enabled);
        assert!(page.hidden.is_empty());
        assert_eq!(page.indicator, None);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_rule_update_uses_latest_snapshot() {
        let mut page = FakePage::with_texts(&["Election A", "Bitcoin B"]);
        let mut s = session("election");
        let first = FilterConfig {
            keywords: vec!["bitcoin".into()],
            ..FilterConfig::default()
        };
        let second = FilterConfig {
            keywords: vec!["weather".into()],
            ..FilterConfig::default()
        };
        s.update_config(0, first, &mut page);
        s.update_config(100, second, &mut page);
        assert!(s.tick(500, &mut page).is_none());
        let report = s.tick(600, &mut page).unwrap();
        assert_eq!(report.hidden_count, 0);
        assert_eq!(s.config().keywords, vec!["weather"]);
    }
}
