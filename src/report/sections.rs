//! Report Section Catalog
//!
//! Static definitions of the sections each report period is built from:
//! prompt, response schema, model mode, and what happens when generation
//! is exhausted. Insight sections degrade through the fallback composer;
//! everything else propagates typed errors.

use serde_json::{json, Value};

use crate::types::{FailurePolicy, GenerationMode, ReportPeriod};

/// One report section's generation contract.
pub struct SectionSpec {
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub mode: GenerationMode,
    pub failure_policy: FailurePolicy,
    /// Composite sections return multiple sub-sections in one response,
    /// recognized by the unwrapper's marker keys and spliced by the
    /// assembler.
    pub composite: bool,
    schema: fn() -> Value,
}

impl SectionSpec {
    pub fn schema(&self) -> Value {
        (self.schema)()
    }
}

/// Sections generated for the given period, in assembly order.
pub fn sections_for(period: ReportPeriod) -> Vec<SectionSpec> {
    match period {
        ReportPeriod::Daily => vec![
            SectionSpec {
                name: "daily_summary",
                system_prompt: "You summarize one day of journal entries into a short, \
                                factual reflection. Write in the second person.",
                mode: GenerationMode::Fast,
                failure_policy: FailurePolicy::Propagate,
                composite: false,
                schema: summary_schema,
            },
            SectionSpec {
                name: "daily_insight",
                system_prompt: "You surface one gentle, encouraging insight from a day \
                                of journal entries. Never give medical advice.",
                mode: GenerationMode::Fast,
                failure_policy: FailurePolicy::Fallback,
                composite: false,
                schema: insight_schema,
            },
        ],
        ReportPeriod::Weekly => vec![
            SectionSpec {
                name: "integrated_weekly",
                system_prompt: "You compose a weekly reflective report from journal \
                                entries: a short overview plus per-topic sections for \
                                mood, habits, and notable moments.",
                mode: GenerationMode::Reasoned,
                failure_policy: FailurePolicy::Propagate,
                composite: true,
                schema: integrated_weekly_schema,
            },
            SectionSpec {
                name: "weekly_insight",
                system_prompt: "You surface one gentle, encouraging insight from a week \
                                of journal entries. Never give medical advice.",
                mode: GenerationMode::Fast,
                failure_policy: FailurePolicy::Fallback,
                composite: false,
                schema: insight_schema,
            },
        ],
        ReportPeriod::Monthly => vec![
            SectionSpec {
                name: "monthly_overview",
                system_prompt: "You summarize a month of journal entries into a concise \
                                overview of how the month went.",
                mode: GenerationMode::Reasoned,
                failure_policy: FailurePolicy::Propagate,
                composite: false,
                schema: summary_schema,
            },
            SectionSpec {
                name: "monthly_themes",
                system_prompt: "You extract the recurring themes from a month of journal \
                                entries, each with a one-sentence description.",
                mode: GenerationMode::Fast,
                failure_policy: FailurePolicy::Propagate,
                composite: false,
                schema: themes_schema,
            },
            SectionSpec {
                name: "monthly_insight",
                system_prompt: "You surface one gentle, encouraging insight from a month \
                                of journal entries. Never give medical advice.",
                mode: GenerationMode::Fast,
                failure_policy: FailurePolicy::Fallback,
                composite: false,
                schema: insight_schema,
            },
        ],
    }
}

// =============================================================================
// Schemas
// =============================================================================

fn summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "mood": {
                "type": "string",
                "enum": ["positive", "neutral", "mixed", "difficult"]
            }
        },
        "required": ["summary"]
    })
}

fn insight_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "insight": { "type": "string" },
            "highlights": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["insight"]
    })
}

fn themes_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "themes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name"]
                }
            }
        },
        "required": ["themes"]
    })
}

fn integrated_weekly_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "overview": {
                "type": "object",
                "properties": {
                    "summary": { "type": "string" }
                },
                "required": ["summary"]
            },
            "report_sections": {
                "type": "object",
                "properties": {
                    "mood": summary_schema(),
                    "habits": summary_schema(),
                    "moments": summary_schema()
                }
            }
        },
        "required": ["overview"]
    })
}

// =============================================================================
// Tests
// =============================================================================
