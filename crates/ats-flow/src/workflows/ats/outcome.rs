use tracing::debug;

use super::catalog::SuccessPatterns;
use crate::browser::Page;

/// What the page says after a strategy ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Applied,
    ManualReview(String),
    Failed(String),
}

/// Reads the page text and classifies the attempt. Success indicators take
/// precedence over manual-review indicators, which take precedence over
/// failure indicators. A page with no indicator, or whose content cannot be
/// read, counts as applied.
pub fn classify_outcome(page: &dyn Page, patterns: &SuccessPatterns) -> Verdict {
    let content = match page.content() {
        Ok(content) => content.to_lowercase(),
        Err(err) => {
            debug!(error = %err, "outcome content unavailable");
            return Verdict::Applied;
        }
    };
    classify_text(&content, patterns)
}

pub fn classify_text(lowered: &str, patterns: &SuccessPatterns) -> Verdict {
    if first_match(lowered, &patterns.success_indicators).is_some() {
        return Verdict::Applied;
    }
    if let Some(indicator) = first_match(lowered, &patterns.manual_review_indicators) {
        return Verdict::ManualReview(indicator.to_string());
    }
    if let Some(indicator) = first_match(lowered, &patterns.failure_indicators) {
        return Verdict::Failed(indicator.to_string());
    }
    Verdict::Applied
}

fn first_match<'a>(lowered: &str, indicators: &[&'a str]) -> Option<&'a str> {
    indicators
        .iter()
        .copied()
        .find(|indicator| lowered.contains(indicator))
}
