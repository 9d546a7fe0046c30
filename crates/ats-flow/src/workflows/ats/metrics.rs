use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog::{AtsPattern, FieldMapping, PatternCatalog, SuccessPatterns};
use super::domain::{ApplicationResult, ApplicationStatus, AtsVendor};

/// Cumulative optimizer statistics. Counters always satisfy
/// `total_attempts == successful + failed + manual_reviews`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMetrics {
    pub total_attempts: u64,
    pub successful_applications: u64,
    pub failed_applications: u64,
    pub manual_reviews_required: u64,
    pub average_application_time: f64,
    pub ats_detection_accuracy: f64,
    pub form_prefill_success_rate: f64,
    #[serde(skip)]
    prefill_denominator: usize,
}

impl ApplicationMetrics {
    /// `prefill_denominator` is the number of fields a complete fill would
    /// write (the generic mapping length).
    pub fn new(prefill_denominator: usize) -> Self {
        Self {
            total_attempts: 0,
            successful_applications: 0,
            failed_applications: 0,
            manual_reviews_required: 0,
            average_application_time: 0.0,
            ats_detection_accuracy: 0.0,
            form_prefill_success_rate: 0.0,
            prefill_denominator,
        }
    }

    pub fn for_catalog(catalog: &PatternCatalog) -> Self {
        Self::new(catalog.generic_field_count())
    }

    pub fn record(&mut self, result: &ApplicationResult) {
        self.total_attempts += 1;
        match result.status {
            ApplicationStatus::Applied => self.successful_applications += 1,
            ApplicationStatus::ManualReview => self.manual_reviews_required += 1,
            ApplicationStatus::Failed | ApplicationStatus::Timeout => {
                self.failed_applications += 1
            }
        }

        let n = self.total_attempts as f64;
        let prefill_rate =
            result.fields_filled.len() as f64 / self.prefill_denominator.max(1) as f64;

        self.average_application_time =
            running_mean(self.average_application_time, result.duration_seconds, n);
        self.ats_detection_accuracy =
            running_mean(self.ats_detection_accuracy, result.confidence, n);
        self.form_prefill_success_rate =
            running_mean(self.form_prefill_success_rate, prefill_rate, n);
    }

    /// Point-in-time report; `None` before the first attempt.
    pub fn summarize(&self) -> Option<MetricsSummary> {
        if self.total_attempts == 0 {
            return None;
        }

        let total = self.total_attempts as f64;
        Some(MetricsSummary {
            total_attempts: self.total_attempts,
            success_rate: round_to(self.successful_applications as f64 / total * 100.0, 1),
            failure_rate: round_to(self.failed_applications as f64 / total * 100.0, 1),
            manual_review_rate: round_to(
                self.manual_reviews_required as f64 / total * 100.0,
                1,
            ),
            average_application_time: round_to(self.average_application_time, 1),
            ats_detection_accuracy: round_to(self.ats_detection_accuracy, 2),
            form_prefill_success_rate: round_to(self.form_prefill_success_rate, 2),
        })
    }
}

fn running_mean(previous: f64, value: f64, n: f64) -> f64 {
    (previous * (n - 1.0) + value) / n
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Percentages are 0-100, rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_attempts: u64,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub manual_review_rate: f64,
    pub average_application_time: f64,
    pub ats_detection_accuracy: f64,
    pub form_prefill_success_rate: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to write snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct OptimizationSnapshot<'a> {
    timestamp: DateTime<Local>,
    metrics: &'a ApplicationMetrics,
    ats_patterns: std::collections::BTreeMap<AtsVendor, &'a AtsPattern>,
    form_field_mappings: &'a std::collections::BTreeMap<AtsVendor, FieldMapping>,
    success_patterns: &'a SuccessPatterns,
}

/// Writes `{profile}_optimization_{YYYYmmdd_HHMMSS}.json` into `dir`.
pub fn write_snapshot(
    dir: &Path,
    profile_name: &str,
    metrics: &ApplicationMetrics,
    catalog: &PatternCatalog,
) -> Result<PathBuf, SnapshotError> {
    let timestamp = Local::now();
    let path = dir.join(format!(
        "{profile_name}_optimization_{}.json",
        timestamp.format("%Y%m%d_%H%M%S")
    ));
    let io_error = |source| SnapshotError::Io {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_error)?;
    let snapshot = OptimizationSnapshot {
        timestamp,
        metrics,
        ats_patterns: catalog.patterns_by_vendor(),
        form_field_mappings: catalog.field_mappings(),
        success_patterns: catalog.success_patterns(),
    };

    let mut writer = BufWriter::new(File::create(&path).map_err(io_error)?);
    serde_json::to_writer_pretty(&mut writer, &snapshot)?;
    writer.flush().map_err(io_error)?;
    Ok(path)
}

/// Best-effort variant of [`write_snapshot`]: failures are logged and
/// reported as `false`.
pub fn persist_snapshot(
    dir: &Path,
    profile_name: &str,
    metrics: &ApplicationMetrics,
    catalog: &PatternCatalog,
) -> bool {
    match write_snapshot(dir, profile_name, metrics, catalog) {
        Ok(path) => {
            info!(path = %path.display(), "optimization data saved");
            true
        }
        Err(err) => {
            warn!(error = %err, "failed to save optimization data");
            false
        }
    }
}

/// Newest snapshot written for `profile_name`, if any.
pub fn latest_snapshot(dir: &Path, profile_name: &str) -> std::io::Result<Option<PathBuf>> {
    let prefix = format!("{profile_name}_optimization_");
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };

    let mut newest: Option<PathBuf> = None;
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"));
        // Timestamped names sort chronologically.
        if matches && newest.as_ref().map_or(true, |current| path > *current) {
            newest = Some(path);
        }
    }
    Ok(newest)
}
