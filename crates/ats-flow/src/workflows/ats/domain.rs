use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Applicant tracking systems the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtsVendor {
    Workday,
    Greenhouse,
    Lever,
    #[serde(rename = "bamboohr")]
    BambooHr,
    Icims,
    Generic,
}

impl AtsVendor {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Workday,
            Self::Greenhouse,
            Self::Lever,
            Self::BambooHr,
            Self::Icims,
            Self::Generic,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workday => "workday",
            Self::Greenhouse => "greenhouse",
            Self::Lever => "lever",
            Self::BambooHr => "bamboohr",
            Self::Icims => "icims",
            Self::Generic => "generic",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Workday => "Workday",
            Self::Greenhouse => "Greenhouse",
            Self::Lever => "Lever",
            Self::BambooHr => "BambooHR",
            Self::Icims => "iCIMS",
            Self::Generic => "Generic",
        }
    }
}

impl fmt::Display for AtsVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ATS vendor '{0}'")]
pub struct UnknownVendor(pub String);

impl FromStr for AtsVendor {
    type Err = UnknownVendor;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '_', '-'], "");
        Self::ordered()
            .into_iter()
            .find(|vendor| vendor.as_str() == normalized)
            .ok_or_else(|| UnknownVendor(value.to_string()))
    }
}

/// Logical application form fields, in the order they are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    Phone,
    Resume,
    CoverLetter,
}

impl FormField {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::FirstName,
            Self::LastName,
            Self::Email,
            Self::Phone,
            Self::Resume,
            Self::CoverLetter,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Resume => "resume",
            Self::CoverLetter => "cover_letter",
        }
    }

    /// Upload fields take a file path instead of typed text.
    pub const fn is_upload(self) -> bool {
        matches!(self, Self::Resume | Self::CoverLetter)
    }
}

/// Vendor guess for a job posting page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub vendor: AtsVendor,
    pub confidence: f64,
}

impl Detection {
    pub const fn new(vendor: AtsVendor, confidence: f64) -> Self {
        Self { vendor, confidence }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Failed,
    ManualReview,
    Timeout,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Failed => "Failed",
            Self::ManualReview => "Manual Review",
            Self::Timeout => "Timeout",
        }
    }
}

/// Outcome of one application attempt through the strategy dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationResult {
    pub status: ApplicationStatus,
    pub vendor: AtsVendor,
    pub strategy: AtsVendor,
    pub confidence: f64,
    pub fields_filled: BTreeMap<FormField, String>,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplicationResult {
    /// Status line understood by the batch runner's outcome classification.
    pub fn status_line(&self) -> String {
        match &self.error {
            Some(error) => format!("{}: {}", self.status.label(), error),
            None => format!("{} via {}", self.status.label(), self.strategy.label()),
        }
    }
}
