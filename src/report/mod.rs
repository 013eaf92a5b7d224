//! Report Assembly
//!
//! The canonical caller of the generation orchestrator. Builds daily,
//! weekly, and monthly reflective reports by fanning out one generation
//! per section and joining the results. Branches are independent: a failed
//! section never cancels its siblings, and insight sections degrade
//! through the fallback composer instead of failing.

mod sections;

pub use sections::{sections_for, SectionSpec};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::gen::{InsightContext, Orchestrator};
use crate::types::{FailurePolicy, GenerationRequest, ReportPeriod, Result, Tier};

// =============================================================================
// Input & Output
// =============================================================================

/// One journal entry in the reporting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub date: NaiveDate,
    pub text: String,
}

/// Everything needed to assemble one report.
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub period: ReportPeriod,
    pub tier: Tier,
    pub user_id: Option<String>,
    /// Per-section deadline; unset means no time bound.
    pub deadline: Option<Duration>,
    pub entries: Vec<EntrySnapshot>,
}

/// Assembled report: generated sections keyed by name.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub period: ReportPeriod,
    pub generated_at: DateTime<Utc>,
    pub sections: Map<String, Value>,
}

// =============================================================================
// Assembler
// =============================================================================

/// Fans section generations out over the orchestrator and joins them into
/// a [`Report`].
pub struct ReportAssembler {
    orchestrator: Arc<Orchestrator>,
}

impl ReportAssembler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Generate every section for the input's period concurrently.
    ///
    /// All branches run to completion regardless of sibling outcomes; if
    /// any propagate-policy section failed, the first such error is
    /// returned after the join.
    pub async fn assemble(&self, input: &ReportInput) -> Result<Report> {
        let specs = sections_for(input.period);
        let user_prompt = format_entries(&input.entries);

        let branches = specs
            .iter()
            .map(|spec| self.run_section(spec, input, &user_prompt));
        let outcomes = join_all(branches).await;

        let mut sections = Map::new();
        let mut first_error = None;

        for (spec, outcome) in specs.iter().zip(outcomes) {
            match outcome {
                Ok(payload) => splice_section(&mut sections, spec, payload),
                Err(err) => {
                    warn!(section = spec.name, code = err.code(), "section failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        info!(
            period = %input.period,
            sections = sections.len(),
            "report assembled"
        );

        Ok(Report {
            period: input.period,
            generated_at: Utc::now(),
            sections,
        })
    }

    async fn run_section(
        &self,
        spec: &SectionSpec,
        input: &ReportInput,
        user_prompt: &str,
    ) -> Result<Value> {
        let mut builder = GenerationRequest::builder(spec.name)
            .system_prompt(spec.system_prompt)
            .user_prompt(user_prompt)
            .schema(spec.schema())
            .tier(input.tier)
            .mode(spec.mode)
            .failure_policy(spec.failure_policy);

        if let Some(user_id) = &input.user_id {
            builder = builder.user_id(user_id.clone());
        }
        if let Some(deadline) = input.deadline {
            builder = builder.deadline(deadline);
        }
        let request = builder.build();

        match spec.failure_policy {
            FailurePolicy::Fallback => {
                let context = insight_context(input);
                Ok(self
                    .orchestrator
                    .generate_or_fallback(&request, &context)
                    .await)
            }
            FailurePolicy::Propagate => self.orchestrator.generate(&request).await,
        }
    }
}

/// Merge one generated payload into the report's section map. Composite
/// payloads are split: each entry of `report_sections` becomes a section
/// of its own, and `overview` keeps its key.
fn splice_section(sections: &mut Map<String, Value>, spec: &SectionSpec, payload: Value) {
    if !spec.composite {
        sections.insert(spec.name.to_string(), payload);
        return;
    }

    let mut spliced = false;
    if let Some(Value::Object(parts)) = payload.get("report_sections") {
        for (name, value) in parts {
            sections.insert(name.clone(), value.clone());
        }
        spliced = true;
    }
    if let Some(overview) = payload.get("overview") {
        sections.insert("overview".to_string(), overview.clone());
        spliced = true;
    }

    // Model ignored the composite shape; keep what it gave us.
    if !spliced {
        sections.insert(spec.name.to_string(), payload);
    }
}

fn format_entries(entries: &[EntrySnapshot]) -> String {
    if entries.is_empty() {
        return "(no entries recorded in this period)".to_string();
    }
    entries
        .iter()
        .map(|e| format!("- {}: {}", e.date, e.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Partial context the fallback composer works from when an insight
/// branch is exhausted.
fn insight_context(input: &ReportInput) -> InsightContext {
    InsightContext {
        summary: None,
        highlights: input
            .entries
            .iter()
            .map(|e| e.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .take(3)
            .collect(),
        period: Some(input.period),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::provider::{ModelCall, ModelProvider, RawResponse, TokenUsage};
    use crate::gen::NoDelay;
    use crate::types::RecapError;
    use async_trait::async_trait;
    use serde_json::json;

    /// Provider stub keyed on system-prompt substrings, since section
    /// branches run concurrently and call order is not deterministic.
    struct KeyedProvider {
        responses: Vec<(&'static str, Result<String>)>,
    }

    #[async_trait]
    impl ModelProvider for KeyedProvider {
        async fn generate(&self, call: &ModelCall<'_>) -> Result<RawResponse> {
            for (needle, response) in &self.responses {
                if call.system_prompt.contains(needle) {
                    return match response {
                        Ok(text) => Ok(RawResponse {
                            text: text.clone(),
                            usage: TokenUsage::new(40, 15),
                            latency: Duration::from_millis(5),
                            model: call.model.to_string(),
                        }),
                        Err(err) => Err(RecapError::transport(err.to_string())),
                    };
                }
            }
            Err(RecapError::transport("no scripted response"))
        }

        fn name(&self) -> &str {
            "keyed"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn assembler(responses: Vec<(&'static str, Result<String>)>) -> ReportAssembler {
        let orchestrator = Orchestrator::builder(Arc::new(KeyedProvider { responses }))
            .delay(Arc::new(NoDelay))
            .build();
        ReportAssembler::new(Arc::new(orchestrator))
    }

    fn input(period: ReportPeriod) -> ReportInput {
        ReportInput {
            period,
            tier: Tier::Free,
            user_id: Some("user-1".to_string()),
            deadline: None,
            entries: vec![
                EntrySnapshot {
                    date: NaiveDate::from_ymd_opt(2026, 8, 24).unwrap(),
                    text: "Ran 5k before work.".to_string(),
                },
                EntrySnapshot {
                    date: NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(),
                    text: "Slept badly, skipped the gym.".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_daily_report_assembles_both_sections() {
        let assembler = assembler(vec![
            (
                "summarize one day",
                Ok(r#"{"daily_summary": {"summary": "An active day.", "mood": "positive"}}"#
                    .to_string()),
            ),
            (
                "encouraging insight",
                Ok(r#"{"insight": "Morning runs set your tone.", "highlights": []}"#.to_string()),
            ),
        ]);

        let report = assembler.assemble(&input(ReportPeriod::Daily)).await.unwrap();
        assert_eq!(report.period, ReportPeriod::Daily);
        assert_eq!(report.sections["daily_summary"]["summary"], "An active day.");
        assert_eq!(
            report.sections["daily_insight"]["insight"],
            "Morning runs set your tone."
        );
    }

    #[tokio::test]
    async fn test_weekly_composite_is_spliced() {
        let composite = json!({
            "overview": {"summary": "A steady week."},
            "report_sections": {
                "mood": {"summary": "Mostly calm.", "mood": "neutral"},
                "habits": {"summary": "Three runs logged."}
            }
        });
        let assembler = assembler(vec![
            ("weekly reflective report", Ok(composite.to_string())),
            (
                "encouraging insight",
                Ok(r#"{"insight": "Consistency beats intensity."}"#.to_string()),
            ),
        ]);

        let report = assembler
            .assemble(&input(ReportPeriod::Weekly))
            .await
            .unwrap();

        assert_eq!(report.sections["overview"]["summary"], "A steady week.");
        assert_eq!(report.sections["mood"]["mood"], "neutral");
        assert_eq!(report.sections["habits"]["summary"], "Three runs logged.");
        assert_eq!(
            report.sections["weekly_insight"]["insight"],
            "Consistency beats intensity."
        );
        assert!(!report.sections.contains_key("integrated_weekly"));
    }

    #[tokio::test]
    async fn test_failed_insight_degrades_instead_of_failing() {
        let assembler = assembler(vec![(
            "summarize one day",
            Ok(r#"{"summary": "A quiet day."}"#.to_string()),
        )]);

        let report = assembler.assemble(&input(ReportPeriod::Daily)).await.unwrap();
        assert_eq!(report.sections["daily_summary"]["summary"], "A quiet day.");

        let insight = &report.sections["daily_insight"];
        assert_eq!(insight["degraded"], true);
        // Fallback highlights come from the entries on hand.
        assert_eq!(insight["highlights"][0], "Ran 5k before work.");
    }

    #[tokio::test]
    async fn test_failed_required_section_propagates() {
        let assembler = assembler(vec![(
            "encouraging insight",
            Ok(r#"{"insight": "Still here for you."}"#.to_string()),
        )]);

        let err = assembler
            .assemble(&input(ReportPeriod::Daily))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_empty_entries_still_produce_a_prompt() {
        let prompt = format_entries(&[]);
        assert!(prompt.contains("no entries"));
    }

    #[test]
    fn test_entry_formatting() {
        let entries = vec![EntrySnapshot {
            date: NaiveDate::from_ymd_opt(2026, 8, 24).unwrap(),
            text: "  Ran 5k.  ".to_string(),
        }];
        assert_eq!(format_entries(&entries), "- 2026-08-24: Ran 5k.");
    }
}
