use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::{AtsPattern, PatternCatalog};
use super::domain::{AtsVendor, Detection};
use crate::browser::{probe_or, Page, PageError};

/// Attempts made at DOM scoring before giving up on the page.
pub const DETECTION_ATTEMPTS: u32 = 2;

/// Scores added per matching probe, plus the threshold and fallback
/// confidences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionWeights {
    pub url_match: f64,
    pub dom_selector: f64,
    pub text_indicator: f64,
    pub form_selector: f64,
    pub threshold: f64,
    pub fallback: f64,
    pub failure: f64,
}

impl Default for DetectionWeights {
    fn default() -> Self {
        Self {
            url_match: 0.9,
            dom_selector: 0.3,
            text_indicator: 0.2,
            form_selector: 0.2,
            threshold: 0.6,
            fallback: 0.3,
            failure: 0.1,
        }
    }
}

// Sums of tenths are not exact in binary floating point.
const SCORE_TOLERANCE: f64 = 1e-9;

/// Decides which vendor rendered a job posting.
///
/// The URL is checked first and wins outright. Otherwise every vendor is
/// scored on DOM selectors, page text and form selectors, and the first
/// vendor in catalog order whose score reaches the threshold is returned,
/// even when a later vendor would score higher. Detection never fails: an
/// unreadable page yields the generic vendor at the failure confidence.
#[derive(Debug, Clone)]
pub struct AtsDetector {
    catalog: Arc<PatternCatalog>,
    weights: DetectionWeights,
}

impl AtsDetector {
    pub fn new(catalog: Arc<PatternCatalog>, weights: DetectionWeights) -> Self {
        Self { catalog, weights }
    }

    pub fn detect(&self, page: &dyn Page, job_url: &str) -> Detection {
        if let Some(detection) = self.detect_from_url(job_url) {
            return detection;
        }

        for attempt in 1..=DETECTION_ATTEMPTS {
            match self.score_page(page) {
                Ok(detection) => {
                    debug!(
                        vendor = %detection.vendor,
                        confidence = detection.confidence,
                        "ATS detected from page"
                    );
                    return detection;
                }
                Err(err) => warn!(attempt, error = %err, "ATS detection attempt failed"),
            }
        }

        Detection::new(AtsVendor::Generic, self.weights.failure)
    }

    /// URL-only detection. Never touches the page.
    pub fn detect_from_url(&self, job_url: &str) -> Option<Detection> {
        let vendor = self.catalog.vendor_for_url(job_url)?;
        info!(vendor = %vendor, job_url, "ATS detected by URL");
        Some(Detection::new(vendor, clamp(self.weights.url_match)))
    }

    /// URL detection, or the generic vendor at the failure confidence when
    /// the page cannot be read at all.
    pub fn detect_unreadable(&self, job_url: &str) -> Detection {
        self.detect_from_url(job_url)
            .unwrap_or_else(|| Detection::new(AtsVendor::Generic, self.weights.failure))
    }

    fn score_page(&self, page: &dyn Page) -> Result<Detection, PageError> {
        let content = match page.content() {
            Ok(content) => content.to_lowercase(),
            Err(err) if err.is_page_gone() => return Err(err),
            Err(err) => {
                debug!(error = %err, "page content unavailable, scoring selectors only");
                String::new()
            }
        };

        for pattern in self.catalog.patterns() {
            let score = self.score_vendor(page, pattern, &content);
            if score + SCORE_TOLERANCE >= self.weights.threshold {
                return Ok(Detection::new(pattern.vendor, clamp(score)));
            }
        }

        Ok(Detection::new(AtsVendor::Generic, clamp(self.weights.fallback)))
    }

    fn score_vendor(&self, page: &dyn Page, pattern: &AtsPattern, content: &str) -> f64 {
        let dom_hits = count_present(page, &pattern.dom_selectors);
        let text_hits = pattern
            .text_indicators
            .iter()
            .filter(|indicator| content.contains(&indicator.to_lowercase()))
            .count();
        let form_hits = count_present(page, &pattern.form_selectors);

        dom_hits as f64 * self.weights.dom_selector
            + text_hits as f64 * self.weights.text_indicator
            + form_hits as f64 * self.weights.form_selector
    }
}

fn count_present(page: &dyn Page, selectors: &[&str]) -> usize {
    selectors
        .iter()
        .filter(|selector| {
            probe_or("query_selector_all", false, || {
                Ok(!page.query_selector_all(selector)?.is_empty())
            })
        })
        .count()
}

fn clamp(confidence: f64) -> f64 {
    confidence.clamp(0.0, 1.0)
}
