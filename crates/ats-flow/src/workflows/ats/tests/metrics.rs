use std::collections::BTreeMap;
use std::fs;

use crate::workflows::ats::{
    latest_snapshot, persist_snapshot, ApplicationMetrics, ApplicationResult, ApplicationStatus,
    AtsVendor, FormField, PatternCatalog,
};

fn result(status: ApplicationStatus, seconds: f64, filled: usize) -> ApplicationResult {
    let fields_filled: BTreeMap<FormField, String> = FormField::ordered()
        .into_iter()
        .take(filled)
        .map(|field| (field, "value".to_string()))
        .collect();
    ApplicationResult {
        status,
        vendor: AtsVendor::Greenhouse,
        strategy: AtsVendor::Greenhouse,
        confidence: 0.9,
        fields_filled,
        duration_seconds: seconds,
        error: None,
    }
}

#[test]
fn average_duration_is_a_running_mean() {
    let mut metrics = ApplicationMetrics::for_catalog(&PatternCatalog::standard());
    for seconds in [10.0, 20.0, 30.0] {
        metrics.record(&result(ApplicationStatus::Applied, seconds, 6));
    }

    assert_eq!(metrics.average_application_time, 20.0);
    assert!((metrics.ats_detection_accuracy - 0.9).abs() < 1e-9);
    assert_eq!(metrics.form_prefill_success_rate, 1.0);
}

#[test]
fn zero_values_still_move_the_averages() {
    let mut metrics = ApplicationMetrics::new(6);
    metrics.record(&result(ApplicationStatus::Applied, 12.0, 3));
    metrics.record(&result(ApplicationStatus::Failed, 0.0, 0));

    assert_eq!(metrics.average_application_time, 6.0);
    assert_eq!(metrics.form_prefill_success_rate, 0.25);
}

#[test]
fn timeouts_count_as_failures() {
    let mut metrics = ApplicationMetrics::new(6);
    metrics.record(&result(ApplicationStatus::Timeout, 300.0, 0));
    metrics.record(&result(ApplicationStatus::ManualReview, 5.0, 2));

    assert_eq!(metrics.failed_applications, 1);
    assert_eq!(metrics.manual_reviews_required, 1);
    assert_eq!(metrics.total_attempts, 2);
}

#[test]
fn summary_reports_percentages() {
    let mut metrics = ApplicationMetrics::new(6);
    assert!(metrics.summarize().is_none());

    metrics.record(&result(ApplicationStatus::Applied, 10.0, 6));
    metrics.record(&result(ApplicationStatus::Applied, 10.0, 6));
    metrics.record(&result(ApplicationStatus::Failed, 10.0, 0));

    let summary = metrics.summarize().expect("attempts recorded");
    assert_eq!(summary.total_attempts, 3);
    assert_eq!(summary.success_rate, 66.7);
    assert_eq!(summary.failure_rate, 33.3);
    assert_eq!(summary.manual_review_rate, 0.0);
    assert_eq!(summary.form_prefill_success_rate, 0.67);
}

#[test]
fn snapshot_contains_metrics_and_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let catalog = PatternCatalog::standard();
    let mut metrics = ApplicationMetrics::for_catalog(&catalog);
    metrics.record(&result(ApplicationStatus::Applied, 10.0, 4));

    assert!(persist_snapshot(dir.path(), "jane", &metrics, &catalog));

    let path = latest_snapshot(dir.path(), "jane")
        .expect("directory readable")
        .expect("snapshot written");
    let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
    assert!(name.starts_with("jane_optimization_") && name.ends_with(".json"));

    let raw = fs::read_to_string(&path).expect("snapshot readable");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(json["metrics"]["total_attempts"], 1);
    assert_eq!(json["metrics"]["successful_applications"], 1);
    assert!(json["timestamp"].is_string());
    assert_eq!(json["ats_patterns"]["workday"]["url_patterns"][0], "workday.com");
    assert_eq!(json["form_field_mappings"]["generic"]["email"][1], "#email");
    assert_eq!(json["success_patterns"]["manual_review_indicators"][0], "captcha");
}

#[test]
fn persist_failure_is_reported_not_raised() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not-a-directory");
    fs::write(&blocker, "x").expect("write blocker");

    let catalog = PatternCatalog::standard();
    let metrics = ApplicationMetrics::for_catalog(&catalog);

    assert!(!persist_snapshot(&blocker, "jane", &metrics, &catalog));
    assert_eq!(latest_snapshot(dir.path(), "jane").expect("readable"), None);
}
