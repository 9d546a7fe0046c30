//! Batch application runs over imported job lists.

mod runner;
pub mod stats;
pub mod submitter;

pub use runner::{classify_status, BatchReport, BatchRunner, StatusClass, TIMEOUT_STATUS};
pub use stats::{BatchStats, JobOutcome, JobReport, StatsLine, StatsRow, RETRY_RATE_WARNING};
pub use submitter::{
    AtsChoice, ManualSubmitter, OptimizerSubmitter, StandardRegistry, SubmitError, Submission,
    Submitter, SubmitterKind, SubmitterRegistry, MANUAL_APPLICATION_REVIEW, MANUAL_REVIEW_QUEUED,
    VERIFICATION_REVIEW,
};
