use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::browser::{Page, PageError};
use crate::workflows::ats::{
    ApplicationRequest, ApplicationStatus, AtsVendor, StrategyDispatcher, UnknownVendor,
};
use crate::workflows::deadline::Deadline;
use crate::workflows::jobs::{
    CandidateProfile, GeneratedDocuments, Job, JobStore, NewReview, StoreError,
};

pub const MANUAL_APPLICATION_REVIEW: &str = "manual_application";
pub const VERIFICATION_REVIEW: &str = "verification_required";
pub const MANUAL_REVIEW_QUEUED: &str = "Manual Review queued";

/// Which submitter handles a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitterKind {
    Ats(AtsVendor),
    Manual,
}

impl fmt::Display for SubmitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitterKind::Ats(vendor) => f.write_str(vendor.as_str()),
            SubmitterKind::Manual => f.write_str("manual"),
        }
    }
}

/// How the batch picks a submitter: detect per job, or use one for every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtsChoice {
    #[default]
    Auto,
    Forced(SubmitterKind),
}

impl FromStr for AtsChoice {
    type Err = UnknownVendor;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "manual" => Ok(Self::Forced(SubmitterKind::Manual)),
            other => other
                .parse::<AtsVendor>()
                .map(|vendor| Self::Forced(SubmitterKind::Ats(vendor))),
        }
    }
}

/// Everything a submitter needs for one attempt. Owned so the attempt can
/// run on a worker thread.
#[derive(Debug, Clone)]
pub struct Submission {
    pub job: Job,
    pub profile: CandidateProfile,
    pub documents: GeneratedDocuments,
    pub kind: SubmitterKind,
    pub forced: bool,
    pub deadline: Deadline,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("job has no url")]
    MissingUrl,
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no submitter available for {0}")]
    Unavailable(SubmitterKind),
}

/// Submits one application and reports a human-readable status line.
pub trait Submitter: Send + Sync {
    fn submit(&self, submission: &Submission) -> Result<String, SubmitError>;
}

pub trait SubmitterRegistry: Send + Sync {
    fn submitter(&self, kind: SubmitterKind) -> Result<Arc<dyn Submitter>, SubmitError>;
}

fn review_context(job: &Job, kind: SubmitterKind) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("url".to_string(), job.url().unwrap_or_default().to_string()),
        ("ats".to_string(), kind.to_string()),
    ])
}

/// Queues the job for a human instead of applying.
pub struct ManualSubmitter {
    store: Arc<dyn JobStore>,
}

impl ManualSubmitter {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }
}

impl Submitter for ManualSubmitter {
    fn submit(&self, submission: &Submission) -> Result<String, SubmitError> {
        let job = &submission.job;
        let review = self.store.enqueue_review(NewReview {
            job_id: job.id(),
            review_type: MANUAL_APPLICATION_REVIEW.to_string(),
            title: format!(
                "Apply manually: {} at {}",
                job.display_title(),
                job.display_company()
            ),
            description: "No automated submitter is available for this posting.".to_string(),
            context: review_context(job, submission.kind),
            priority: 2,
            screenshot_path: None,
        })?;
        info!(review_id = review.id, job_id = %job.id(), "queued job for manual application");
        Ok(MANUAL_REVIEW_QUEUED.to_string())
    }
}

/// Applies through the strategy dispatcher on the run's single page.
pub struct OptimizerSubmitter {
    dispatcher: Arc<Mutex<StrategyDispatcher>>,
    page: Mutex<Box<dyn Page>>,
    store: Arc<dyn JobStore>,
}

impl OptimizerSubmitter {
    pub fn new(
        dispatcher: Arc<Mutex<StrategyDispatcher>>,
        page: Box<dyn Page>,
        store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            dispatcher,
            page: Mutex::new(page),
            store,
        }
    }
}

impl Submitter for OptimizerSubmitter {
    fn submit(&self, submission: &Submission) -> Result<String, SubmitError> {
        let job = &submission.job;
        if job.url().is_none() {
            return Err(SubmitError::MissingUrl);
        }

        let page = self.page.lock().unwrap_or_else(PoisonError::into_inner);

        let mut request = ApplicationRequest::new(job, &submission.profile)
            .with_documents(&submission.documents)
            .with_deadline(submission.deadline);
        if let (true, SubmitterKind::Ats(vendor)) = (submission.forced, submission.kind) {
            request = request.with_vendor(vendor);
        }

        let result = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .navigate_and_apply(request, &**page);

        if result.status == ApplicationStatus::ManualReview {
            let queued = self.store.enqueue_review(NewReview {
                job_id: job.id(),
                review_type: VERIFICATION_REVIEW.to_string(),
                title: format!("Finish application: {}", job.display_title()),
                description: result
                    .error
                    .clone()
                    .unwrap_or_else(|| "page requires a human".to_string()),
                context: review_context(job, SubmitterKind::Ats(result.vendor)),
                priority: 1,
                screenshot_path: None,
            });
            if let Err(err) = queued {
                warn!(error = %err, "failed to queue verification review");
            }
        }

        Ok(result.status_line())
    }
}

/// Routes every ATS vendor to the optimizer and `Manual` to the review queue.
pub struct StandardRegistry {
    optimizer: Arc<dyn Submitter>,
    manual: Arc<dyn Submitter>,
}

impl StandardRegistry {
    pub fn new(optimizer: Arc<dyn Submitter>, manual: Arc<dyn Submitter>) -> Self {
        Self { optimizer, manual }
    }
}

impl SubmitterRegistry for StandardRegistry {
    fn submitter(&self, kind: SubmitterKind) -> Result<Arc<dyn Submitter>, SubmitError> {
        match kind {
            SubmitterKind::Ats(_) => Ok(Arc::clone(&self.optimizer)),
            SubmitterKind::Manual => Ok(Arc::clone(&self.manual)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ats_choice_parses_auto_manual_and_vendors() {
        assert_eq!("auto".parse::<AtsChoice>(), Ok(AtsChoice::Auto));
        assert_eq!(
            "Manual".parse::<AtsChoice>(),
            Ok(AtsChoice::Forced(SubmitterKind::Manual))
        );
        assert_eq!(
            "icims".parse::<AtsChoice>(),
            Ok(AtsChoice::Forced(SubmitterKind::Ats(AtsVendor::Icims)))
        );
        assert!("taleo".parse::<AtsChoice>().is_err());
    }

    #[test]
    fn kind_display_matches_log_column() {
        assert_eq!(SubmitterKind::Ats(AtsVendor::BambooHr).to_string(), "bamboohr");
        assert_eq!(SubmitterKind::Manual.to_string(), "manual");
    }
}
