//! CSV job lists: import for batch runs, export of scraped jobs, the
//! starter template and the console preview.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{Job, UNKNOWN_COMPANY, UNKNOWN_LOCATION, UNKNOWN_POSITION};

pub const CSV_IMPORT_SITE: &str = "CSV Import";
pub const EXPORT_SUMMARY_LIMIT: usize = 200;
pub const PREVIEW_URL_WIDTH: usize = 50;

pub const EXPORT_COLUMNS: [&str; 10] = [
    "url",
    "title",
    "company",
    "location",
    "summary",
    "salary",
    "experience_level",
    "remote_option",
    "site",
    "posted_date",
];

#[derive(Debug)]
pub enum CsvImportError {
    Io { path: PathBuf, source: std::io::Error },
    Csv(csv::Error),
    MissingUrlColumn { found: Vec<String> },
}

impl std::fmt::Display for CsvImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsvImportError::Io { path, source } => {
                write!(f, "failed to open {}: {}", path.display(), source)
            }
            CsvImportError::Csv(err) => write!(f, "invalid job CSV data: {}", err),
            CsvImportError::MissingUrlColumn { found } => write!(
                f,
                "CSV must contain at least a 'url' column (found: {})",
                found.join(", ")
            ),
        }
    }
}

impl std::error::Error for CsvImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CsvImportError::Io { source, .. } => Some(source),
            CsvImportError::Csv(err) => Some(err),
            CsvImportError::MissingUrlColumn { .. } => None,
        }
    }
}

impl From<csv::Error> for CsvImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct JobRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    title: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    company: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    salary: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    experience_level: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    remote_option: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    site: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    posted_date: Option<String>,
}

impl JobRow {
    fn into_job(self) -> Job {
        Job {
            url: self.url,
            title: self.title.unwrap_or_else(|| UNKNOWN_POSITION.to_string()),
            company: self.company.unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            location: self.location.unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            summary: self.summary.unwrap_or_default(),
            salary: self.salary,
            experience_level: self.experience_level,
            remote_option: self.remote_option,
            site: Some(self.site.unwrap_or_else(|| CSV_IMPORT_SITE.to_string())),
            posted_date: self.posted_date,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub struct JobCsvImporter;

impl JobCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Job>, CsvImportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CsvImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Parses every data row. Rows with a blank url are kept so the batch
    /// runner can count them as skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Job>, CsvImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if !headers.iter().any(|header| header == "url") {
            return Err(CsvImportError::MissingUrlColumn {
                found: headers.iter().map(str::to_string).collect(),
            });
        }

        let mut jobs = Vec::new();
        for (index, row) in csv_reader.deserialize::<JobRow>().enumerate() {
            let job = row?.into_job();
            if job.url().is_none() {
                // Header is line 1.
                warn!(row = index + 2, "CSV row has an empty url and will be skipped");
            }
            jobs.push(job);
        }

        info!(jobs = jobs.len(), "loaded jobs from CSV");
        Ok(jobs)
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    url: &'a str,
    title: &'a str,
    company: &'a str,
    location: &'a str,
    summary: String,
    salary: &'a str,
    experience_level: &'a str,
    remote_option: &'a str,
    site: &'a str,
    posted_date: &'a str,
}

impl<'a> ExportRow<'a> {
    fn from_job(job: &'a Job) -> Self {
        Self {
            url: job.url.as_deref().unwrap_or(""),
            title: job.display_title(),
            company: job.display_company(),
            location: job.display_location(),
            summary: job.summary.chars().take(EXPORT_SUMMARY_LIMIT).collect(),
            salary: job.salary.as_deref().unwrap_or(""),
            experience_level: job.experience_level.as_deref().unwrap_or(""),
            remote_option: job.remote_option.as_deref().unwrap_or(""),
            site: job.site.as_deref().unwrap_or("Unknown"),
            posted_date: job.posted_date.as_deref().unwrap_or(""),
        }
    }
}

/// Writes `jobs` with the export columns. Missing title, company and
/// location become the Unknown placeholders and summaries are truncated.
pub fn write_jobs_csv<W: Write>(writer: W, jobs: &[Job]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if jobs.is_empty() {
        csv_writer.write_record(EXPORT_COLUMNS)?;
    }
    for job in jobs {
        csv_writer.serialize(ExportRow::from_job(job))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_jobs_csv(path: &Path, jobs: &[Job]) -> Result<(), CsvImportError> {
    let file = File::create(path).map_err(|source| CsvImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_jobs_csv(file, jobs)?;
    info!(jobs = jobs.len(), path = %path.display(), "exported jobs CSV");
    Ok(())
}

/// Starter file for users building their own job list.
pub fn csv_template() -> String {
    [
        "url,title,company,location,summary,salary,experience_level,remote_option",
        "https://example.com/job1,Software Developer,Example Corp,\"Toronto, ON\",Develop web applications using Python and React,80000-100000,mid,hybrid",
        "https://example.com/job2,Data Analyst,Data Inc,Remote,Analyze data and create reports,70000-90000,entry,remote",
        "https://example.com/job3,Senior Engineer,Tech Solutions,\"Vancouver, BC\",Lead development team and architect solutions,120000-150000,senior,onsite",
    ]
    .join("\n")
        + "\n"
}

/// One line of the job preview table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPreviewRow {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
}

pub fn preview_rows(jobs: &[Job], limit: usize) -> Vec<JobPreviewRow> {
    jobs.iter()
        .take(limit)
        .map(|job| JobPreviewRow {
            title: job.display_title().to_string(),
            company: job.display_company().to_string(),
            location: job.display_location().to_string(),
            url: truncate_url(job.url.as_deref().unwrap_or("")),
        })
        .collect()
}

fn truncate_url(url: &str) -> String {
    if url.chars().count() <= PREVIEW_URL_WIDTH {
        return url.to_string();
    }
    let head: String = url.chars().take(PREVIEW_URL_WIDTH - 3).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_keeps_blank_url_rows_and_fills_placeholders() {
        let data = "url,title\n,X\nhttp://a.com/job,Y\n";
        let jobs = JobCsvImporter::from_reader(data.as_bytes()).expect("parses");

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].url(), None);
        assert_eq!(jobs[0].title, "X");
        assert_eq!(jobs[1].url(), Some("http://a.com/job"));
        assert_eq!(jobs[1].company, UNKNOWN_COMPANY);
        assert_eq!(jobs[1].location, UNKNOWN_LOCATION);
        assert_eq!(jobs[1].site.as_deref(), Some(CSV_IMPORT_SITE));
    }

    #[test]
    fn import_requires_url_column() {
        let data = "title,company\nEngineer,Acme\n";
        match JobCsvImporter::from_reader(data.as_bytes()) {
            Err(CsvImportError::MissingUrlColumn { found }) => {
                assert_eq!(found, vec!["title".to_string(), "company".to_string()]);
            }
            other => panic!("expected missing url column, got {other:?}"),
        }
    }

    #[test]
    fn template_parses_as_three_jobs() {
        let jobs = JobCsvImporter::from_reader(csv_template().as_bytes()).expect("template parses");
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].location, "Toronto, ON");
        assert_eq!(jobs[2].experience_level.as_deref(), Some("senior"));
    }

    #[test]
    fn export_applies_placeholders_and_truncates_summary() {
        let job = Job {
            url: Some("https://jobs.lever.co/acme/1".into()),
            summary: "x".repeat(250),
            ..Job::default()
        };

        let mut buffer = Vec::new();
        write_jobs_csv(&mut buffer, &[job]).expect("export succeeds");
        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some(EXPORT_COLUMNS.join(",").as_str()));
        let row = lines.next().expect("data row");
        assert!(row.contains("Unknown Position,Unknown Company,Unknown Location"));
        assert!(row.contains(&format!(",{},", "x".repeat(EXPORT_SUMMARY_LIMIT))));
        assert!(row.ends_with(",Unknown,"));
    }

    #[test]
    fn preview_truncates_long_urls() {
        let long = format!("https://example.com/{}", "a".repeat(60));
        let jobs = vec![Job::new(long, "Engineer", "Acme"), Job::new("https://b.com", "", "")];
        let rows = preview_rows(&jobs, 10);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].url.chars().count(), PREVIEW_URL_WIDTH);
        assert!(rows[0].url.ends_with("..."));
        assert_eq!(rows[1].title, UNKNOWN_POSITION);
        assert_eq!(preview_rows(&jobs, 1).len(), 1);
    }
}
