use serde::Serialize;

use crate::workflows::jobs::JobId;

/// Retry rates above this percentage get flagged in the insights.
pub const RETRY_RATE_WARNING: f64 = 20.0;

/// Terminal state of one job in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Applied,
    Manual,
    Failed,
    Skipped,
}

impl JobOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Manual => "Manual Review",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
        }
    }

    /// Applied and manual both count as handled.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Applied | Self::Manual)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub title: String,
    pub url: Option<String>,
    pub outcome: JobOutcome,
    pub attempts: u32,
    pub last_status: String,
}

/// Run-level counters. `total` equals the sum of the four terminal buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub applied: u32,
    pub manual: u32,
    pub failed: u32,
    pub skipped: u32,
    pub retried: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsLine {
    Applied,
    ManualReview,
    Failed,
    Skipped,
    Retried,
    SuccessRate,
    Total,
}

impl StatsLine {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Applied,
            Self::ManualReview,
            Self::Failed,
            Self::Skipped,
            Self::Retried,
            Self::SuccessRate,
            Self::Total,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::ManualReview => "Manual Review",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
            Self::Retried => "Retried",
            Self::SuccessRate => "Success Rate",
            Self::Total => "Total Processed",
        }
    }

    pub const fn details(self) -> &'static str {
        match self {
            Self::Applied => "Fully automated",
            Self::ManualReview => "Requires manual action",
            Self::Failed => "Could not process",
            Self::Skipped => "No URL or invalid",
            Self::Retried => "Retry attempts made",
            Self::SuccessRate => "Applied + Manual",
            Self::Total => "All jobs attempted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRow {
    pub line: StatsLine,
    pub label: &'static str,
    pub count: u32,
    pub percentage: f64,
    pub details: &'static str,
}

impl BatchStats {
    pub fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Applied => self.applied += 1,
            JobOutcome::Manual => self.manual += 1,
            JobOutcome::Failed => self.failed += 1,
            JobOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn successful(&self) -> u32 {
        self.applied + self.manual
    }

    /// Share of `count` in the run total, 0-100 with one decimal.
    pub fn percentage(&self, count: u32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (f64::from(count) / f64::from(self.total) * 1000.0).round() / 10.0
    }

    pub fn count(&self, line: StatsLine) -> u32 {
        match line {
            StatsLine::Applied => self.applied,
            StatsLine::ManualReview => self.manual,
            StatsLine::Failed => self.failed,
            StatsLine::Skipped => self.skipped,
            StatsLine::Retried => self.retried,
            StatsLine::SuccessRate => self.successful(),
            StatsLine::Total => self.total,
        }
    }

    /// Results table rows; empty when no jobs were processed.
    pub fn rows(&self) -> Vec<StatsRow> {
        if self.total == 0 {
            return Vec::new();
        }
        StatsLine::ordered()
            .into_iter()
            .map(|line| {
                let count = self.count(line);
                StatsRow {
                    line,
                    label: line.label(),
                    count,
                    percentage: self.percentage(count),
                    details: line.details(),
                }
            })
            .collect()
    }

    pub fn retry_rate(&self) -> f64 {
        self.percentage(self.retried)
    }

    pub fn insights(&self) -> Vec<String> {
        let mut insights = Vec::new();
        if self.total == 0 {
            return insights;
        }

        insights.push(format!("{} jobs applied automatically", self.applied));
        insights.push(format!("{} jobs require manual review", self.manual));
        insights.push(format!("{} jobs failed to process", self.failed));
        if self.retried > 0 {
            insights.push(format!("{} retry attempts made", self.retried));
        }
        if self.skipped > 0 {
            insights.push(format!("{} jobs skipped (no URL)", self.skipped));
        }

        if self.applied > 0 {
            insights.push(format!(
                "Automation rate: {:.1}%",
                self.percentage(self.applied)
            ));
            if self.retried > 0 {
                let retry_rate = self.retry_rate();
                insights.push(format!("Retry rate: {retry_rate:.1}%"));
                if retry_rate > RETRY_RATE_WARNING {
                    insights.push(
                        "High retry rate detected; check network or ATS availability".to_string(),
                    );
                }
            }
        }
        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> BatchStats {
        BatchStats {
            applied: 2,
            manual: 1,
            failed: 1,
            skipped: 0,
            retried: 3,
            total: 4,
        }
    }

    #[test]
    fn rows_follow_report_order_with_percentages() {
        let rows = stats().rows();
        let labels: Vec<_> = rows.iter().map(|row| row.label).collect();
        assert_eq!(
            labels,
            vec![
                "Applied",
                "Manual Review",
                "Failed",
                "Skipped",
                "Retried",
                "Success Rate",
                "Total Processed"
            ]
        );
        assert_eq!(rows[0].percentage, 50.0);
        assert_eq!(rows[5].count, 3);
        assert_eq!(rows[5].percentage, 75.0);
        assert_eq!(rows[6].percentage, 100.0);
    }

    #[test]
    fn high_retry_rate_is_flagged() {
        let insights = stats().insights();
        assert!(insights.contains(&"Retry rate: 75.0%".to_string()));
        assert!(insights.iter().any(|line| line.starts_with("High retry rate")));

        let calm = BatchStats {
            retried: 0,
            ..stats()
        };
        assert!(!calm.insights().iter().any(|line| line.contains("retry")));
    }

    #[test]
    fn empty_run_has_no_rows() {
        assert!(BatchStats::default().rows().is_empty());
        assert!(BatchStats::default().insights().is_empty());
        assert_eq!(BatchStats::default().percentage(3), 0.0);
    }
}
