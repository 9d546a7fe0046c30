//! Static detection and form tables.
//!
//! Everything here is immutable for the lifetime of a run and is serialized
//! verbatim into optimizer snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{AtsVendor, FormField};

/// Detection probes for one vendor. Probe lists are ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtsPattern {
    #[serde(skip)]
    pub vendor: AtsVendor,
    #[serde(rename = "url_patterns")]
    pub url_substrings: Vec<&'static str>,
    pub dom_selectors: Vec<&'static str>,
    pub text_indicators: Vec<&'static str>,
    #[serde(rename = "form_patterns")]
    pub form_selectors: Vec<&'static str>,
}

impl AtsPattern {
    pub fn matches_url(&self, lowered_url: &str) -> bool {
        self.url_substrings
            .iter()
            .any(|fragment| lowered_url.contains(fragment))
    }
}

/// Selector candidates per logical field, tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMapping {
    selectors: BTreeMap<FormField, Vec<&'static str>>,
}

impl FieldMapping {
    pub fn new(entries: impl IntoIterator<Item = (FormField, Vec<&'static str>)>) -> Self {
        Self {
            selectors: entries.into_iter().collect(),
        }
    }

    pub fn selectors(&self, field: FormField) -> &[&'static str] {
        self.selectors
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Fields in fill order.
    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.selectors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessPatterns {
    pub success_indicators: Vec<&'static str>,
    pub failure_indicators: Vec<&'static str>,
    pub manual_review_indicators: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternCatalog {
    patterns: Vec<AtsPattern>,
    mappings: BTreeMap<AtsVendor, FieldMapping>,
    success: SuccessPatterns,
}

impl PatternCatalog {
    pub fn new(
        patterns: Vec<AtsPattern>,
        mappings: BTreeMap<AtsVendor, FieldMapping>,
        success: SuccessPatterns,
    ) -> Self {
        Self {
            patterns,
            mappings,
            success,
        }
    }

    pub fn standard() -> Self {
        Self::new(
            standard_patterns(),
            standard_field_mappings(),
            standard_success_patterns(),
        )
    }

    /// Detection probes in declaration order. Detection honours this order
    /// when more than one vendor crosses the threshold.
    pub fn patterns(&self) -> &[AtsPattern] {
        &self.patterns
    }

    pub fn vendor_for_url(&self, job_url: &str) -> Option<AtsVendor> {
        let lowered = job_url.to_lowercase();
        self.patterns
            .iter()
            .find(|pattern| pattern.matches_url(&lowered))
            .map(|pattern| pattern.vendor)
    }

    /// Field mapping for `vendor`, falling back to the generic mapping.
    pub fn field_mapping(&self, vendor: AtsVendor) -> &FieldMapping {
        self.mappings
            .get(&vendor)
            .or_else(|| self.mappings.get(&AtsVendor::Generic))
            .unwrap_or(&EMPTY_MAPPING)
    }

    pub fn field_mappings(&self) -> &BTreeMap<AtsVendor, FieldMapping> {
        &self.mappings
    }

    /// Denominator for the prefill rate.
    pub fn generic_field_count(&self) -> usize {
        self.field_mapping(AtsVendor::Generic).len()
    }

    pub fn success_patterns(&self) -> &SuccessPatterns {
        &self.success
    }

    pub fn patterns_by_vendor(&self) -> BTreeMap<AtsVendor, &AtsPattern> {
        self.patterns
            .iter()
            .map(|pattern| (pattern.vendor, pattern))
            .collect()
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

static EMPTY_MAPPING: FieldMapping = FieldMapping {
    selectors: BTreeMap::new(),
};

/// Cheap URL guesses used by the batch runner when the detector has nothing
/// better than the generic fallback. Checked in this order.
pub const URL_HEURISTICS: [(&str, AtsVendor); 5] = [
    ("workday", AtsVendor::Workday),
    ("icims", AtsVendor::Icims),
    ("greenhouse", AtsVendor::Greenhouse),
    ("bamboohr", AtsVendor::BambooHr),
    ("lever", AtsVendor::Lever),
];

pub fn heuristic_vendor_for_url(job_url: &str) -> Option<AtsVendor> {
    let lowered = job_url.to_lowercase();
    URL_HEURISTICS
        .iter()
        .find(|(fragment, _)| lowered.contains(fragment))
        .map(|(_, vendor)| *vendor)
}

pub fn standard_patterns() -> Vec<AtsPattern> {
    vec![
        AtsPattern {
            vendor: AtsVendor::Workday,
            url_substrings: vec!["workday.com", "myworkday.com", "wd1.myworkdayjobs.com"],
            dom_selectors: vec!["[data-automation-id]", ".css-1hwfws3", ".workday"],
            text_indicators: vec!["workday", "powered by workday"],
            form_selectors: vec!["input[data-automation-id]"],
        },
        AtsPattern {
            vendor: AtsVendor::Greenhouse,
            url_substrings: vec!["greenhouse.io", "boards.greenhouse.io"],
            dom_selectors: vec![".application-form", ".greenhouse-form"],
            text_indicators: vec!["greenhouse", "powered by greenhouse"],
            form_selectors: vec!["input[name*=\"application\"]"],
        },
        AtsPattern {
            vendor: AtsVendor::Lever,
            url_substrings: vec!["lever.co", "jobs.lever.co"],
            dom_selectors: vec![".application-form", ".lever-form"],
            text_indicators: vec!["lever", "powered by lever"],
            form_selectors: vec!["input[name*=\"lever\"]"],
        },
        AtsPattern {
            vendor: AtsVendor::BambooHr,
            url_substrings: vec!["bamboohr.com", "bamboohr.co"],
            dom_selectors: vec![".bamboo-form", ".application-container"],
            text_indicators: vec!["bamboohr", "bamboo hr"],
            form_selectors: vec!["input[name*=\"bamboo\"]"],
        },
    ]
}

pub fn standard_field_mappings() -> BTreeMap<AtsVendor, FieldMapping> {
    use FormField::*;

    let workday = FieldMapping::new([
        (
            FirstName,
            vec![
                "input[data-automation-id*=\"firstName\"]",
                "input[name*=\"firstName\"]",
            ],
        ),
        (
            LastName,
            vec![
                "input[data-automation-id*=\"lastName\"]",
                "input[name*=\"lastName\"]",
            ],
        ),
        (
            Email,
            vec!["input[data-automation-id*=\"email\"]", "input[type=\"email\"]"],
        ),
        (
            Phone,
            vec!["input[data-automation-id*=\"phone\"]", "input[type=\"tel\"]"],
        ),
        (
            Resume,
            vec!["input[data-automation-id*=\"resume\"]", "input[type=\"file\"]"],
        ),
        (CoverLetter, vec!["input[data-automation-id*=\"coverLetter\"]"]),
    ]);

    let greenhouse = FieldMapping::new([
        (FirstName, vec!["input[name*=\"first_name\"]", "#first_name"]),
        (LastName, vec!["input[name*=\"last_name\"]", "#last_name"]),
        (Email, vec!["input[name*=\"email\"]", "#email"]),
        (Phone, vec!["input[name*=\"phone\"]", "#phone"]),
        (Resume, vec!["input[name*=\"resume\"]", "input[type=\"file\"]"]),
        (CoverLetter, vec!["input[name*=\"cover_letter\"]"]),
    ]);

    let generic = FieldMapping::new([
        (
            FirstName,
            vec!["input[name*=\"first\"]", "#firstName", "#first_name"],
        ),
        (LastName, vec!["input[name*=\"last\"]", "#lastName", "#last_name"]),
        (
            Email,
            vec!["input[type=\"email\"]", "#email", "input[name*=\"email\"]"],
        ),
        (
            Phone,
            vec!["input[type=\"tel\"]", "#phone", "input[name*=\"phone\"]"],
        ),
        (Resume, vec!["input[type=\"file\"]", "input[name*=\"resume\"]"]),
        (
            CoverLetter,
            vec!["input[name*=\"cover\"]", "input[name*=\"letter\"]"],
        ),
    ]);

    BTreeMap::from([
        (AtsVendor::Workday, workday),
        (AtsVendor::Greenhouse, greenhouse),
        (AtsVendor::Generic, generic),
    ])
}

pub fn standard_success_patterns() -> SuccessPatterns {
    SuccessPatterns {
        success_indicators: vec![
            "application submitted",
            "thank you for applying",
            "application received",
            "we have received your application",
            "application complete",
            "successfully submitted",
        ],
        failure_indicators: vec![
            "error occurred",
            "please try again",
            "required field",
            "invalid format",
            "file too large",
            "unsupported file type",
        ],
        manual_review_indicators: vec![
            "captcha",
            "verify you are human",
            "security check",
            "additional information required",
            "please complete",
            "screening questions",
        ],
    }
}
