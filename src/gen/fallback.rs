//! Fallback Composer
//!
//! Synthesizes a degraded-but-valid insight payload when every generation
//! attempt is exhausted. Used only by call sites that must return something
//! usable rather than error; composition never fails, for any (including
//! empty) domain context.

use chrono::Utc;
use serde_json::{json, Value};

use crate::constants::fallback as fallback_constants;
use crate::types::ReportPeriod;

/// Whatever partial domain context is on hand when generation fails.
#[derive(Debug, Clone, Default)]
pub struct InsightContext {
    /// An existing summary (e.g. from a previous report) to reuse.
    pub summary: Option<String>,
    /// Notable items already extracted from the user's entries.
    pub highlights: Vec<String>,
    pub period: Option<ReportPeriod>,
}

/// Composer for degraded insight payloads.
pub struct InsightFallback;

impl InsightFallback {
    /// Build a minimal valid insight from the available context.
    ///
    /// The payload always has at least one populated section; an entirely
    /// empty context yields a generic placeholder insight.
    pub fn compose(context: &InsightContext) -> Value {
        let insight = context
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(truncate_summary)
            .unwrap_or_else(|| Self::placeholder(context.period));

        let highlights: Vec<&str> = context
            .highlights
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .take(3)
            .collect();

        json!({
            "insight": insight,
            "highlights": highlights,
            "degraded": true,
            "generated_at": Utc::now().to_rfc3339(),
        })
    }

    fn placeholder(period: Option<ReportPeriod>) -> String {
        match period {
            Some(period) => format!(
                "Your {} reflection is not available right now. Check back shortly.",
                period
            ),
            None => "Your reflection is not available right now. Check back shortly.".to_string(),
        }
    }
}

/// Truncate to the summary character budget, appending an ellipsis marker
/// when anything was cut.
fn truncate_summary(text: &str) -> String {
    let budget = fallback_constants::SUMMARY_CHAR_BUDGET;
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let truncated: String = text.chars().take(budget).collect();
    format!("{}{}", truncated.trim_end(), fallback_constants::ELLIPSIS)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_still_produces_insight() {
        let payload = InsightFallback::compose(&InsightContext::default());

        assert!(payload.is_object());
        let insight = payload["insight"].as_str().unwrap();
        assert!(!insight.is_empty());
        assert_eq!(payload["degraded"], true);
    }

    #[test]
    fn test_short_summary_kept_verbatim() {
        let context = InsightContext {
            summary: Some("A calm, steady week with good sleep.".to_string()),
            ..Default::default()
        };

        let payload = InsightFallback::compose(&context);
        assert_eq!(payload["insight"], "A calm, steady week with good sleep.");
    }

    #[test]
    fn test_long_summary_truncated_with_ellipsis() {
        let context = InsightContext {
            summary: Some("word ".repeat(200)),
            ..Default::default()
        };

        let payload = InsightFallback::compose(&context);
        let insight = payload["insight"].as_str().unwrap();
        assert!(insight.chars().count() <= fallback_constants::SUMMARY_CHAR_BUDGET + 1);
        assert!(insight.ends_with(fallback_constants::ELLIPSIS));
    }

    #[test]
    fn test_blank_summary_falls_back_to_placeholder() {
        let context = InsightContext {
            summary: Some("   ".to_string()),
            period: Some(ReportPeriod::Weekly),
            ..Default::default()
        };

        let payload = InsightFallback::compose(&context);
        let insight = payload["insight"].as_str().unwrap();
        assert!(insight.contains("weekly"));
    }

    #[test]
    fn test_highlights_filtered_and_capped() {
        let context = InsightContext {
            highlights: vec![
                "ran 5k".to_string(),
                "  ".to_string(),
                "slept early".to_string(),
                "read a book".to_string(),
                "extra".to_string(),
            ],
            ..Default::default()
        };

        let payload = InsightFallback::compose(&context);
        let highlights = payload["highlights"].as_array().unwrap();
        assert_eq!(highlights.len(), 3);
        assert_eq!(highlights[0], "ran 5k");
    }
}
