//! ATS detection and application-flow optimization.
//!
//! A [`StrategyDispatcher`] detects which applicant tracking system rendered
//! a job page, fills the vendor's form fields from a candidate profile and
//! classifies the outcome. Every attempt feeds [`ApplicationMetrics`], which
//! can be exported as a JSON snapshot alongside the static catalog.

pub mod catalog;
pub mod detector;
pub mod domain;
pub mod filler;
pub mod metrics;
pub mod outcome;
pub mod strategy;

#[cfg(test)]
mod tests;

pub use catalog::{
    heuristic_vendor_for_url, AtsPattern, FieldMapping, PatternCatalog, SuccessPatterns,
};
pub use detector::{AtsDetector, DetectionWeights, DETECTION_ATTEMPTS};
pub use domain::{
    ApplicationResult, ApplicationStatus, AtsVendor, Detection, FormField, UnknownVendor,
};
pub use filler::{fill_fields, fill_values, FieldValues};
pub use metrics::{
    latest_snapshot, persist_snapshot, write_snapshot, ApplicationMetrics, MetricsSummary,
    SnapshotError,
};
pub use outcome::{classify_outcome, Verdict};
pub use strategy::{
    ApplicationRequest, OptimizerSession, Strategy, StrategyDispatcher, StrategyError,
    WORKDAY_CONTINUE_SELECTORS,
};
