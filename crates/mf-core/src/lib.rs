//! MarketFilter Core Library
//!
//! This crate provides the filter engine for the MarketFilter browser
//! extension, which hides prediction-market listings that match user rules.
//!
//! # Architecture
//!
//! Evaluation is pure and synchronous: every pass takes an immutable
//! `FilterConfig` snapshot, the read-only `CategoryCatalog` and the current
//! candidates, and returns a `ScanReport`. Anything that touches the page or
//! storage sits behind a trait (`PageDriver`, `SettingsStore`) so hosts can
//! be the real DOM, a captured page, or a test double.
//!
//! # Modules
//!
//! - `types`: Filter config, candidates, extracted fields
//! - `catalog`: Category definitions with compiled keyword patterns
//! - `extract`: Price/volume/liquidity scraping from card text
//! - `rule`: The staged filter predicate
//! - `engine`: Scan passes over all candidates
//! - `watcher`: Pass scheduling, retry and supersession
//! - `profile`: Site selectors and timing
//! - `session`: Per-page glue between watcher, engine and page
//! - `settings`: Persisted config, presets, tracked markets
//! - `protocol`: Extension runtime messages

pub mod types;
pub mod catalog;
pub mod extract;
pub mod rule;
pub mod engine;
pub mod watcher;
pub mod profile;
pub mod session;
pub mod settings;
pub mod protocol;

// Re-export commonly used types
pub use catalog::{Category, CategoryCatalog, CatalogError};
pub use engine::{evaluate, Decision, FilterEngine, PageDriver, ScanReport};
pub use extract::{extract_liquidity, extract_price, extract_volume, FieldExtractor, TextExtractor};
pub use profile::PageProfile;
pub use rule::{explain, should_filter, ActiveStages, FilterReason};
pub use session::FilterSession;
pub use settings::{ExtensionSettings, SavedFilterConfig, SettingsError, SettingsStore, TrackedMarket};
pub use types::{Candidate, CandidateId, ConfigError, ExtractedFields, FilterConfig, PriceRange};
pub use watcher::{ChangeWatcher, InsertedNode, PassOutcome, RetryPolicy, Trigger};
