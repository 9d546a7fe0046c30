use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::stats::{BatchStats, JobOutcome, JobReport};
use super::submitter::{AtsChoice, Submission, Submitter, SubmitterKind, SubmitterRegistry};
use crate::config::BatchConfig;
use crate::workflows::ats::{heuristic_vendor_for_url, AtsDetector};
use crate::workflows::deadline::Deadline;
use crate::workflows::jobs::{
    ApplicationLogEntry, CandidateProfile, DocumentGenerator, GeneratedDocuments, Job, JobStore,
};

pub const TIMEOUT_STATUS: &str = "Timeout";

/// How a submitter's status line is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Applied,
    Manual,
    Retry,
}

/// The leading status label wins over keywords found later in the line,
/// which may echo a url or page text.
pub fn classify_status(status: &str) -> StatusClass {
    let status = status.trim_start();
    if status.starts_with("Failed") || status.starts_with(TIMEOUT_STATUS) {
        StatusClass::Retry
    } else if status.starts_with("Manual") {
        StatusClass::Manual
    } else if status.contains("Applied") || status.contains("Success") {
        StatusClass::Applied
    } else if status.contains("Manual") || status.contains("Review") {
        StatusClass::Manual
    } else {
        StatusClass::Retry
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub stats: BatchStats,
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    /// True when at least one job was applied or handed to a human.
    pub fn any_handled(&self) -> bool {
        self.stats.successful() > 0
    }
}

/// Runs a job list through document generation, submitter selection and
/// submission, one job at a time.
pub struct BatchRunner {
    detector: AtsDetector,
    registry: Arc<dyn SubmitterRegistry>,
    documents: Arc<dyn DocumentGenerator>,
    store: Arc<dyn JobStore>,
    config: BatchConfig,
    choice: AtsChoice,
}

impl BatchRunner {
    pub fn new(
        detector: AtsDetector,
        registry: Arc<dyn SubmitterRegistry>,
        documents: Arc<dyn DocumentGenerator>,
        store: Arc<dyn JobStore>,
        config: BatchConfig,
    ) -> Self {
        Self {
            detector,
            registry,
            documents,
            store,
            config,
            choice: AtsChoice::Auto,
        }
    }

    pub fn with_choice(mut self, choice: AtsChoice) -> Self {
        self.choice = choice;
        self
    }

    pub fn run(&self, jobs: &[Job], profile: &CandidateProfile) -> BatchReport {
        let mut stats = BatchStats {
            total: jobs.len() as u32,
            ..BatchStats::default()
        };
        let mut reports = Vec::with_capacity(jobs.len());

        if jobs.is_empty() {
            warn!("no jobs to apply to");
        }

        for (index, job) in jobs.iter().enumerate() {
            info!(
                job = index + 1,
                of = jobs.len(),
                title = job.display_title(),
                company = job.display_company(),
                url = job.url().unwrap_or("no url"),
                "processing job"
            );

            let report = self.process(job, profile, &mut stats);
            stats.record(report.outcome);

            let is_last = index + 1 == jobs.len();
            if !is_last && report.outcome != JobOutcome::Skipped {
                let delay = self.delay_after(report.outcome);
                if !delay.is_zero() {
                    info!(seconds = delay.as_secs(), "waiting before next application");
                    thread::sleep(delay);
                }
            }
            reports.push(report);
        }

        info!(
            applied = stats.applied,
            manual = stats.manual,
            failed = stats.failed,
            skipped = stats.skipped,
            retried = stats.retried,
            "batch finished"
        );
        BatchReport {
            stats,
            jobs: reports,
        }
    }

    /// The submitter a first attempt would use. `None` for jobs that would be
    /// skipped.
    pub fn planned_submitter(&self, job: &Job) -> Option<SubmitterKind> {
        job.url().map(|url| self.resolve_kind(url))
    }

    /// Base delay, doubled after a job that was not handled.
    pub fn delay_after(&self, outcome: JobOutcome) -> Duration {
        if outcome.is_success() {
            self.config.job_delay
        } else {
            self.config.job_delay * 2
        }
    }

    fn process(&self, job: &Job, profile: &CandidateProfile, stats: &mut BatchStats) -> JobReport {
        let report = |outcome, attempts, status: &str| JobReport {
            job_id: job.id(),
            title: job.display_title().to_string(),
            url: job.url().map(str::to_string),
            outcome,
            attempts,
            last_status: status.to_string(),
        };

        let Some(url) = job.url() else {
            warn!(title = job.display_title(), "skipping job with no url");
            return report(JobOutcome::Skipped, 0, "No URL");
        };

        let max_attempts = self.config.max_retries + 1;
        let mut last_status = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                stats.retried += 1;
                info!(retry = attempt - 1, of = self.config.max_retries, "retrying job");
                thread::sleep(self.config.retry_backoff);
            }

            let documents = self.documents.customize(job, profile);
            if documents.resume_path.trim().is_empty() {
                error!(url, "failed to generate documents");
                return report(JobOutcome::Failed, attempt, "Document generation failed");
            }

            let kind = self.resolve_kind(url);
            info!(ats = %kind, "selected submitter");

            let Some((kind, submitter)) = self.acquire(kind) else {
                return report(JobOutcome::Failed, attempt, "No submitter available");
            };

            let submission = Submission {
                job: job.clone(),
                profile: profile.clone(),
                documents: documents.clone(),
                kind,
                forced: matches!(self.choice, AtsChoice::Forced(_)),
                deadline: Deadline::after(self.config.submit_timeout),
            };
            let status = self.submit_with_timeout(submitter, submission);
            info!(status = %status, attempt, "submission finished");

            self.log_attempt(job, profile, &status, &documents, kind, attempt);

            match classify_status(&status) {
                StatusClass::Applied => return report(JobOutcome::Applied, attempt, &status),
                StatusClass::Manual => return report(JobOutcome::Manual, attempt, &status),
                StatusClass::Retry => last_status = status,
            }
        }

        warn!(url, attempts = max_attempts, status = %last_status, "job failed after retries");
        report(JobOutcome::Failed, max_attempts, &last_status)
    }

    /// Forced choice wins; otherwise URL detection, then URL heuristics,
    /// then manual.
    fn resolve_kind(&self, url: &str) -> SubmitterKind {
        if let AtsChoice::Forced(kind) = self.choice {
            return kind;
        }
        self.detector
            .detect_from_url(url)
            .map(|detection| detection.vendor)
            .or_else(|| heuristic_vendor_for_url(url))
            .map(SubmitterKind::Ats)
            .unwrap_or(SubmitterKind::Manual)
    }

    fn acquire(&self, kind: SubmitterKind) -> Option<(SubmitterKind, Arc<dyn Submitter>)> {
        match self.registry.submitter(kind) {
            Ok(submitter) => return Some((kind, submitter)),
            Err(err) => warn!(ats = %kind, error = %err, "submitter unavailable"),
        }
        if kind == SubmitterKind::Manual {
            return None;
        }
        match self.registry.submitter(SubmitterKind::Manual) {
            Ok(submitter) => {
                info!("falling back to manual submitter");
                Some((SubmitterKind::Manual, submitter))
            }
            Err(err) => {
                error!(error = %err, "manual submitter fallback failed");
                None
            }
        }
    }

    /// Runs the submission on a worker thread and stops waiting once the
    /// submit timeout elapses. The worker is not cancelled; it sees the
    /// expired deadline at its next step.
    fn submit_with_timeout(&self, submitter: Arc<dyn Submitter>, submission: Submission) -> String {
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("ats-submit".to_string())
            .spawn(move || {
                let _ = sender.send(submitter.submit(&submission));
            });
        if let Err(err) = spawned {
            return format!("Failed: {err}");
        }

        match receiver.recv_timeout(self.config.submit_timeout) {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                warn!(error = %err, "application submission failed");
                format!("Failed: {err}")
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    seconds = self.config.submit_timeout.as_secs(),
                    "application submission timed out"
                );
                TIMEOUT_STATUS.to_string()
            }
            Err(RecvTimeoutError::Disconnected) => "Failed: submission worker stopped".to_string(),
        }
    }

    fn log_attempt(
        &self,
        job: &Job,
        profile: &CandidateProfile,
        status: &str,
        documents: &GeneratedDocuments,
        kind: SubmitterKind,
        attempt: u32,
    ) {
        let status = if attempt > 1 {
            format!("{status} (attempts: {attempt})")
        } else {
            status.to_string()
        };
        let entry = ApplicationLogEntry {
            timestamp: Utc::now(),
            job_id: job.id(),
            title: job.display_title().to_string(),
            company: job.display_company().to_string(),
            url: job.url().unwrap_or_default().to_string(),
            profile: profile.profile_name.clone(),
            status,
            resume_path: documents.resume_path.clone(),
            cover_letter_path: documents.cover_letter_path.clone(),
            ats: kind.to_string(),
        };
        if let Err(err) = self.store.append_application(entry) {
            warn!(error = %err, "failed to log application result");
        }
    }
}
