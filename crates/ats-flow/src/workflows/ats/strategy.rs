use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::catalog::PatternCatalog;
use super::detector::{AtsDetector, DetectionWeights};
use super::domain::{ApplicationResult, ApplicationStatus, AtsVendor, Detection, FormField};
use super::filler::{fill_values, FieldValues};
use super::metrics::{persist_snapshot, ApplicationMetrics, MetricsSummary};
use super::outcome::{classify_outcome, Verdict};
use crate::browser::{probe_or, Page, PageError};
use crate::workflows::deadline::Deadline;
use crate::workflows::jobs::{CandidateProfile, GeneratedDocuments, Job};

type FilledFields = BTreeMap<FormField, String>;

/// Buttons that advance a multi-step Workday form, in probe order.
pub const WORKDAY_CONTINUE_SELECTORS: [&str; 4] = [
    "button[data-automation-id*=\"next\"]",
    "button[data-automation-id*=\"continue\"]",
    "button:has-text(\"Next\")",
    "button:has-text(\"Continue\")",
];

/// Form-filling strategies. Vendors without a dedicated strategy use
/// `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Workday,
    Greenhouse,
    Lever,
    #[serde(rename = "bamboohr")]
    BambooHr,
    Generic,
}

impl Strategy {
    pub const fn for_vendor(vendor: AtsVendor) -> Self {
        match vendor {
            AtsVendor::Workday => Self::Workday,
            AtsVendor::Greenhouse => Self::Greenhouse,
            AtsVendor::Lever => Self::Lever,
            AtsVendor::BambooHr => Self::BambooHr,
            AtsVendor::Icims | AtsVendor::Generic => Self::Generic,
        }
    }

    /// Vendor whose field mapping the strategy fills with.
    pub const fn vendor(self) -> AtsVendor {
        match self {
            Self::Workday => AtsVendor::Workday,
            Self::Greenhouse => AtsVendor::Greenhouse,
            Self::Lever => AtsVendor::Lever,
            Self::BambooHr => AtsVendor::BambooHr,
            Self::Generic => AtsVendor::Generic,
        }
    }

    fn after_fill(self, page: &dyn Page, settle: Duration) -> Result<(), PageError> {
        match self {
            Self::Workday => advance_workday_form(page, settle).map(|_| ()),
            Self::Greenhouse | Self::Lever | Self::BambooHr | Self::Generic => Ok(()),
        }
    }
}

/// Clicks the first visible continuation button and waits for the next
/// step to render. Returns whether a button was clicked.
fn advance_workday_form(page: &dyn Page, settle: Duration) -> Result<bool, PageError> {
    for selector in WORKDAY_CONTINUE_SELECTORS {
        let element = match page.query_selector(selector) {
            Ok(Some(element)) => element,
            Ok(None) => continue,
            Err(err) if err.is_page_gone() => return Err(err),
            Err(_) => continue,
        };

        if !probe_or("is_visible", false, || element.is_visible()) {
            continue;
        }

        match element.click() {
            Ok(()) => {
                debug!(selector, "advanced Workday form");
                if let Err(err) = page.wait(settle) {
                    debug!(error = %err, "settle wait interrupted");
                }
                return Ok(true);
            }
            Err(err) if err.is_page_gone() => return Err(err),
            Err(err) => debug!(selector, error = %err, "continue button not clickable"),
        }
    }
    Ok(false)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyError {
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// One application attempt.
#[derive(Debug, Clone, Copy)]
pub struct ApplicationRequest<'a> {
    pub job: &'a Job,
    pub profile: &'a CandidateProfile,
    pub documents: Option<&'a GeneratedDocuments>,
    pub deadline: Option<Deadline>,
    /// Vendor chosen by the caller; skips detection.
    pub vendor: Option<AtsVendor>,
}

impl<'a> ApplicationRequest<'a> {
    pub fn new(job: &'a Job, profile: &'a CandidateProfile) -> Self {
        Self {
            job,
            profile,
            documents: None,
            deadline: None,
            vendor: None,
        }
    }

    pub fn with_documents(mut self, documents: &'a GeneratedDocuments) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_vendor(mut self, vendor: AtsVendor) -> Self {
        self.vendor = Some(vendor);
        self
    }

    fn check_deadline(&self) -> Result<(), StrategyError> {
        match self.deadline {
            Some(deadline) if deadline.is_expired() => {
                Err(StrategyError::DeadlineExceeded(deadline.budget()))
            }
            _ => Ok(()),
        }
    }
}

/// Where a dispatcher's snapshots go and whose they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerSession {
    pub profile_name: String,
    pub snapshot_dir: PathBuf,
}

/// Detects the vendor, runs the matching strategy and records the result.
/// `apply` never fails; every failure becomes part of the result.
pub struct StrategyDispatcher {
    catalog: Arc<PatternCatalog>,
    detector: AtsDetector,
    metrics: ApplicationMetrics,
    settle: Duration,
}

impl StrategyDispatcher {
    pub fn new(catalog: Arc<PatternCatalog>, weights: DetectionWeights, settle: Duration) -> Self {
        let metrics = ApplicationMetrics::for_catalog(&catalog);
        Self {
            detector: AtsDetector::new(Arc::clone(&catalog), weights),
            catalog,
            metrics,
            settle,
        }
    }

    pub fn standard(settle: Duration) -> Self {
        Self::new(
            Arc::new(PatternCatalog::standard()),
            DetectionWeights::default(),
            settle,
        )
    }

    pub fn catalog(&self) -> &Arc<PatternCatalog> {
        &self.catalog
    }

    pub fn detector(&self) -> &AtsDetector {
        &self.detector
    }

    pub fn metrics(&self) -> &ApplicationMetrics {
        &self.metrics
    }

    pub fn summarize(&self) -> Option<MetricsSummary> {
        self.metrics.summarize()
    }

    pub fn persist(&self, session: &OptimizerSession) -> bool {
        persist_snapshot(
            &session.snapshot_dir,
            &session.profile_name,
            &self.metrics,
            &self.catalog,
        )
    }

    pub fn apply(
        &mut self,
        job: &Job,
        profile: &CandidateProfile,
        page: &dyn Page,
    ) -> ApplicationResult {
        self.apply_request(ApplicationRequest::new(job, profile), page)
    }

    pub fn apply_with_documents(
        &mut self,
        job: &Job,
        profile: &CandidateProfile,
        documents: &GeneratedDocuments,
        page: &dyn Page,
    ) -> ApplicationResult {
        self.apply_request(
            ApplicationRequest::new(job, profile).with_documents(documents),
            page,
        )
    }

    /// Loads the job url into the page, then applies. A failed navigation
    /// is recorded like any other failed attempt.
    pub fn navigate_and_apply(
        &mut self,
        request: ApplicationRequest<'_>,
        page: &dyn Page,
    ) -> ApplicationResult {
        let Some(job_url) = request.job.url() else {
            return self.apply_request(request, page);
        };

        let started = Instant::now();
        let Err(err) = page.goto(job_url) else {
            return self.apply_request(request, page);
        };

        let detection = match request.vendor {
            Some(vendor) => Detection::new(vendor, 1.0),
            None => self.detector.detect_unreadable(job_url),
        };
        let strategy = Strategy::for_vendor(detection.vendor);
        warn!(job_url, error = %err, "job page did not load");

        let outcome = Err(StrategyError::Page(err));
        let result = build_result(detection, strategy, outcome, started.elapsed());
        self.metrics.record(&result);
        result
    }

    pub fn apply_request(
        &mut self,
        request: ApplicationRequest<'_>,
        page: &dyn Page,
    ) -> ApplicationResult {
        let started = Instant::now();
        let job_url = request
            .job
            .url()
            .map(str::to_string)
            .unwrap_or_else(|| page.url());

        let detection = match request.vendor {
            Some(vendor) => Detection::new(vendor, 1.0),
            None => self.detector.detect(page, &job_url),
        };
        let strategy = Strategy::for_vendor(detection.vendor);
        info!(
            vendor = %detection.vendor,
            confidence = detection.confidence,
            strategy = ?strategy,
            "applying with strategy"
        );

        let outcome = self.run_strategy(strategy, &request, page);
        let result = build_result(detection, strategy, outcome, started.elapsed());

        match result.status {
            ApplicationStatus::Applied => info!(
                job_url = %job_url,
                fields_filled = result.fields_filled.len(),
                "application completed"
            ),
            status => warn!(
                job_url = %job_url,
                status = status.label(),
                error = result.error.as_deref().unwrap_or(""),
                "application did not complete"
            ),
        }

        self.metrics.record(&result);
        result
    }

    fn run_strategy(
        &self,
        strategy: Strategy,
        request: &ApplicationRequest<'_>,
        page: &dyn Page,
    ) -> Result<(FilledFields, Verdict), StrategyError> {
        request.check_deadline()?;
        let mapping = self.catalog.field_mapping(strategy.vendor());
        let values = FieldValues::from_profile(request.profile).with_documents(request.documents);
        let filled = fill_values(page, &values, mapping)?;

        request.check_deadline()?;
        strategy.after_fill(page, self.settle)?;

        request.check_deadline()?;
        let verdict = classify_outcome(page, self.catalog.success_patterns());
        Ok((filled, verdict))
    }
}

fn build_result(
    detection: Detection,
    strategy: Strategy,
    outcome: Result<(FilledFields, Verdict), StrategyError>,
    elapsed: Duration,
) -> ApplicationResult {
    let (status, fields_filled, error) = match outcome {
        Ok((filled, Verdict::Applied)) => (ApplicationStatus::Applied, filled, None),
        Ok((filled, Verdict::ManualReview(indicator))) => {
            (ApplicationStatus::ManualReview, filled, Some(indicator))
        }
        Ok((filled, Verdict::Failed(indicator))) => {
            (ApplicationStatus::Failed, filled, Some(indicator))
        }
        Err(err @ StrategyError::DeadlineExceeded(_)) => {
            (ApplicationStatus::Timeout, Default::default(), Some(err.to_string()))
        }
        Err(err) => (ApplicationStatus::Failed, Default::default(), Some(err.to_string())),
    };

    ApplicationResult {
        status,
        vendor: detection.vendor,
        strategy: strategy.vendor(),
        confidence: detection.confidence,
        fields_filled,
        duration_seconds: elapsed.as_secs_f64(),
        error,
    }
}
