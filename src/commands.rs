use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};

use ats_flow::browser::{BrowserOptions, BrowserSession, HtmlPage, Page, PageSource};
use ats_flow::config::AppConfig;
use ats_flow::error::AppError;
use ats_flow::workflows::ats::{AtsDetector, OptimizerSession, PatternCatalog, StrategyDispatcher};
use ats_flow::workflows::batch::{
    BatchReport, BatchRunner, BatchStats, ManualSubmitter, OptimizerSubmitter, StandardRegistry,
    Submitter,
};
use ats_flow::workflows::jobs::{
    csv_template, export_jobs_csv, preview_rows, CandidateProfile, FileJobStore, Job,
    JobCsvImporter, JobStore, ProfileDocuments,
};
use tracing::{info, warn};

use crate::cli::{ApplyArgs, CsvCommand, DetectArgs, ReviewsCommand};
use crate::infra::HttpPageSource;

const PREVIEW_LIMIT: usize = 10;

pub(crate) fn run_detect(config: &AppConfig, args: DetectArgs) -> Result<(), AppError> {
    let DetectArgs { url, html_file } = args;
    let detector = AtsDetector::new(Arc::new(PatternCatalog::standard()), config.detection);

    let detection = match html_file {
        Some(path) => {
            let page = HtmlPage::new(url.as_str(), fs::read_to_string(path)?);
            detector.detect(&page, &url)
        }
        None => match detector.detect_from_url(&url) {
            Some(detection) => detection,
            None => {
                let source: Arc<dyn PageSource> = Arc::new(HttpPageSource::new(
                    &BrowserOptions::default(),
                    config.batch.submit_timeout,
                )?);
                let page = HtmlPage::blank(source);
                page.goto(&url)?;
                detector.detect(&page, &url)
            }
        },
    };

    println!("ATS detection for {url}");
    println!(
        "- Vendor: {} ({})",
        detection.vendor.label(),
        detection.vendor
    );
    println!("- Confidence: {:.2}", detection.confidence);
    Ok(())
}

pub(crate) fn run_apply(mut config: AppConfig, args: ApplyArgs) -> Result<ExitCode, AppError> {
    let ApplyArgs {
        csv,
        profile,
        ats,
        delay,
        max_retries,
        limit,
        preview,
        dry_run,
    } = args;

    if let Some(profile) = profile {
        config.paths.profile = profile;
    }
    if let Some(delay) = delay {
        config.batch.job_delay = std::time::Duration::from_secs(delay);
    }
    if let Some(max_retries) = max_retries {
        config.batch.max_retries = max_retries;
    }

    let mut jobs = JobCsvImporter::from_path(&csv)?;
    if let Some(limit) = limit {
        jobs.truncate(limit);
        info!(limit, "processing a limited number of jobs");
    }
    if jobs.is_empty() {
        println!("No jobs found in {}", csv.display());
        return Ok(ExitCode::FAILURE);
    }

    if preview {
        render_preview(&jobs);
        return Ok(ExitCode::SUCCESS);
    }

    let candidate = CandidateProfile::load(&config.paths.profiles_dir, &config.paths.profile)?;
    let store = Arc::new(FileJobStore::open(config.paths.store_dir())?);
    let catalog = Arc::new(PatternCatalog::standard());
    let detector = AtsDetector::new(catalog.clone(), config.detection);
    let documents = Arc::new(ProfileDocuments::new(config.paths.profile_dir()));
    let manual: Arc<dyn Submitter> = Arc::new(ManualSubmitter::new(store.clone()));

    if dry_run {
        let registry = Arc::new(StandardRegistry::new(manual.clone(), manual));
        let runner = BatchRunner::new(detector, registry, documents, store, config.batch)
            .with_choice(ats);
        render_plan(&runner, &jobs);
        return Ok(ExitCode::SUCCESS);
    }

    let stored = store.upsert_jobs(&jobs)?;
    info!(stored, profile = %config.paths.profile, "jobs saved");

    let options = BrowserOptions::default();
    let source: Arc<dyn PageSource> =
        Arc::new(HttpPageSource::new(&options, config.batch.submit_timeout)?);
    let session = BrowserSession::open(&source, &options)?;
    let page = session.context().new_page()?;

    let dispatcher = Arc::new(Mutex::new(StrategyDispatcher::new(
        catalog,
        config.detection,
        config.batch.settle,
    )));
    let optimizer: Arc<dyn Submitter> =
        Arc::new(OptimizerSubmitter::new(dispatcher.clone(), page, store.clone()));
    let registry = Arc::new(StandardRegistry::new(optimizer, manual));

    println!(
        "Applying to {} jobs as {}",
        jobs.len(),
        candidate.profile_name
    );
    let report = BatchRunner::new(detector, registry, documents, store, config.batch.clone())
        .with_choice(ats)
        .run(&jobs, &candidate);
    drop(session);

    render_report(&report);

    let dispatcher = dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(summary) = dispatcher.summarize() {
        println!(
            "\nOptimizer: {} attempts | {:.1}% success | {:.1}s average | {:.2} detection confidence",
            summary.total_attempts,
            summary.success_rate,
            summary.average_application_time,
            summary.ats_detection_accuracy
        );
    }
    dispatcher.persist(&OptimizerSession {
        profile_name: config.paths.profile.clone(),
        snapshot_dir: config.paths.snapshot_dir(),
    });

    if report.any_handled() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("no jobs were applied or queued for review");
        Ok(ExitCode::FAILURE)
    }
}

pub(crate) fn run_csv(command: CsvCommand) -> Result<(), AppError> {
    match command {
        CsvCommand::Template { output: Some(path) } => {
            fs::write(&path, csv_template())?;
            println!("Template written to {}", path.display());
        }
        CsvCommand::Template { output: None } => {
            io::stdout().write_all(csv_template().as_bytes())?;
        }
        CsvCommand::Export { input, output } => {
            let jobs = JobCsvImporter::from_path(&input)?;
            export_jobs_csv(&output, &jobs)?;
            println!("Exported {} jobs to {}", jobs.len(), output.display());
        }
    }
    Ok(())
}

pub(crate) fn run_reviews(config: &AppConfig, command: ReviewsCommand) -> Result<(), AppError> {
    let store = FileJobStore::open(config.paths.store_dir())?;
    match command {
        ReviewsCommand::List { status } => {
            let items = store.reviews(status)?;
            if items.is_empty() {
                println!("No review items");
            }
            for item in items {
                println!(
                    "#{} [P{}] {} {}: {}",
                    item.id, item.priority, item.status, item.review_type, item.title
                );
                if let Some(url) = item.context.get("url") {
                    println!("    {url}");
                }
            }
        }
        ReviewsCommand::Resolve {
            id,
            resolution,
            reviewer,
        } => {
            let item = store.resolve_review(id, &resolution, &reviewer)?;
            println!("Review #{} resolved by {}", item.id, reviewer);
        }
        ReviewsCommand::Skip { id } => {
            let item = store.skip_review(id)?;
            println!("Review #{} skipped", item.id);
        }
    }
    Ok(())
}

fn render_preview(jobs: &[Job]) {
    println!("Jobs preview ({} total)", jobs.len());
    for (index, row) in preview_rows(jobs, PREVIEW_LIMIT).iter().enumerate() {
        println!(
            "{:>3}. {} | {} | {} | {}",
            index + 1,
            row.title,
            row.company,
            row.location,
            row.url
        );
    }
    if jobs.len() > PREVIEW_LIMIT {
        println!("... and {} more", jobs.len() - PREVIEW_LIMIT);
    }
}

fn render_plan(runner: &BatchRunner, jobs: &[Job]) {
    println!("Dry run: no applications will be submitted");
    for (index, job) in jobs.iter().enumerate() {
        let planned = runner
            .planned_submitter(job)
            .map_or_else(|| "skip (no url)".to_string(), |kind| kind.to_string());
        println!(
            "{:>3}. {} at {} -> {}",
            index + 1,
            job.display_title(),
            job.display_company(),
            planned
        );
    }
}

fn render_report(report: &BatchReport) {
    println!("\nApplication results");
    for line in stats_table(&report.stats) {
        println!("{line}");
    }

    let insights = report.stats.insights();
    if !insights.is_empty() {
        println!("\nInsights");
        for insight in insights {
            println!("- {insight}");
        }
    }

    let failed: Vec<_> = report
        .jobs
        .iter()
        .filter(|job| !job.outcome.is_success())
        .collect();
    if !failed.is_empty() {
        println!("\nNot applied");
        for job in failed {
            println!(
                "- {} [{}] {}",
                job.title,
                job.outcome.label(),
                job.last_status
            );
        }
    }
}

/// Results table, one formatted line per statistic.
fn stats_table(stats: &BatchStats) -> Vec<String> {
    stats
        .rows()
        .into_iter()
        .map(|row| {
            format!(
                "{:<15} {:>5} {:>6.1}%  {}",
                row.label, row.count, row.percentage, row.details
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_table_has_a_line_per_statistic() {
        let stats = BatchStats {
            applied: 2,
            manual: 1,
            failed: 1,
            skipped: 0,
            retried: 1,
            total: 4,
        };
        let table = stats_table(&stats);
        assert_eq!(table.len(), 7);
        assert!(table[0].starts_with("Applied"));
        assert!(table[0].contains("50.0%"));
        assert!(table[5].starts_with("Success Rate"));
        assert!(table[5].contains("75.0%"));
        assert!(table[6].contains("All jobs attempted"));
    }

    #[test]
    fn empty_run_renders_no_rows() {
        assert!(stats_table(&BatchStats::default()).is_empty());
    }
}
