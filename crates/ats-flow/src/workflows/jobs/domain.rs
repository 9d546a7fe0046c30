use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_POSITION: &str = "Unknown Position";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Stable identifier derived from a job's url, title and company.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn for_job(job: &Job) -> Self {
        // FNV-1a, 64 bit.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        let key = format!(
            "{}|{}|{}",
            job.url.as_deref().unwrap_or("").trim(),
            job.title.trim(),
            job.company.trim()
        );
        for byte in key.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Self(format!("job-{hash:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A job posting as imported or scraped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub url: Option<String>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub summary: String,
    pub salary: Option<String>,
    pub experience_level: Option<String>,
    pub remote_option: Option<String>,
    pub site: Option<String>,
    pub posted_date: Option<String>,
}

impl Job {
    pub fn new(url: impl Into<String>, title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: title.into(),
            company: company.into(),
            ..Self::default()
        }
    }

    /// The posting URL, if present and not blank.
    pub fn url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn id(&self) -> JobId {
        JobId::for_job(self)
    }

    pub fn display_title(&self) -> &str {
        non_empty_or(&self.title, UNKNOWN_POSITION)
    }

    pub fn display_company(&self) -> &str {
        non_empty_or(&self.company, UNKNOWN_COMPANY)
    }

    pub fn display_location(&self) -> &str {
        non_empty_or(&self.location, UNKNOWN_LOCATION)
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Candidate identity used to fill application forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    pub profile_name: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub skills: Vec<String>,
}

impl CandidateProfile {
    /// Explicit first name, otherwise the first word of `name`.
    pub fn first_name(&self) -> String {
        if !self.first_name.trim().is_empty() {
            return self.first_name.trim().to_string();
        }
        self.name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// Explicit last name, otherwise everything after the first word of `name`.
    pub fn last_name(&self) -> String {
        if !self.last_name.trim().is_empty() {
            return self.last_name.trim().to_string();
        }
        self.name
            .split_whitespace()
            .skip(1)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn from_path(path: &Path) -> Result<Self, ProfileError> {
        let raw = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ProfileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `<profiles_dir>/<name>/profile.json`, falling back to
    /// `<profiles_dir>/<name>.json`.
    pub fn load(profiles_dir: &Path, name: &str) -> Result<Self, ProfileError> {
        let candidates = [
            profiles_dir.join(name).join("profile.json"),
            profiles_dir.join(format!("{name}.json")),
        ];
        let path = candidates
            .iter()
            .find(|path| path.is_file())
            .ok_or_else(|| ProfileError::NotFound {
                name: name.to_string(),
                searched: candidates.to_vec(),
            })?;

        let mut profile = Self::from_path(path)?;
        if profile.profile_name.trim().is_empty() {
            profile.profile_name = name.to_string();
        }
        Ok(profile)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile '{name}' not found (searched {searched:?})")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Paths produced by the document generator. An empty path means the
/// document could not be produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDocuments {
    pub resume_path: String,
    pub cover_letter_path: String,
}

impl GeneratedDocuments {
    pub fn is_complete(&self) -> bool {
        !self.resume_path.trim().is_empty() && !self.cover_letter_path.trim().is_empty()
    }
}

/// One row of the application log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationLogEntry {
    pub timestamp: DateTime<Utc>,
    pub job_id: JobId,
    pub title: String,
    pub company: String,
    pub url: String,
    pub profile: String,
    pub status: String,
    pub resume_path: String,
    pub cover_letter_path: String,
    pub ats: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Resolved,
    Skipped,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown review status '{other}'")),
        }
    }
}

/// Priority 1 is the most urgent, 4 the least.
pub const REVIEW_PRIORITY_RANGE: std::ops::RangeInclusive<u8> = 1..=4;

/// Request to queue a job for a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub job_id: JobId,
    pub review_type: String,
    pub title: String,
    pub description: String,
    pub context: BTreeMap<String, String>,
    pub priority: u8,
    pub screenshot_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub id: u64,
    pub job_id: JobId,
    pub review_type: String,
    pub title: String,
    pub description: String,
    pub context: BTreeMap<String, String>,
    pub priority: u8,
    pub screenshot_path: Option<String>,
    pub status: ReviewStatus,
    pub resolution: Option<String>,
    pub reviewer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ReviewItem {
    pub fn from_request(id: u64, review: NewReview, now: DateTime<Utc>) -> Self {
        Self {
            id,
            job_id: review.job_id,
            review_type: review.review_type,
            title: review.title,
            description: review.description,
            context: review.context,
            priority: review.priority,
            screenshot_path: review.screenshot_path,
            status: ReviewStatus::Pending,
            resolution: None,
            reviewer: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }
}
