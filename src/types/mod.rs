//! Core Domain Types
//!
//! Shared types for the generation subsystem: membership tiers, generation
//! modes, the immutable [`GenerationRequest`], and dev-only tracking metadata.

pub mod error;

pub use error::{ErrorClassifier, RecapError, Result};

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// =============================================================================
// Tier & Mode
// =============================================================================

/// Membership tier controlling model choice, token ceilings, and cache
/// partitioning. Free and Pro users never share a cached answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

impl Tier {
    /// Suffix appended to cache keys so tiers stay partitioned.
    pub fn cache_suffix(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cache_suffix())
    }
}

/// Quality/cost trade-off affecting model selection for the Pro tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Fast,
    Reasoned,
}

/// What the orchestrator does when every attempt is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Propagate the typed error to the caller (report generation).
    #[default]
    Propagate,
    /// Hand off to the fallback composer (insight generation).
    Fallback,
}

// =============================================================================
// Generation Request
// =============================================================================

/// Immutable description of one logical generation call.
///
/// Constructed once per call via [`GenerationRequest::builder`]; the
/// orchestrator never mutates it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// JSON-Schema-shaped response contract. Sanitized before each
    /// provider call; the original is left untouched.
    pub schema: Value,
    pub tier: Tier,
    /// Section name, used for envelope detection and telemetry attribution.
    pub section: String,
    pub mode: GenerationMode,
    /// Optional user identifier for telemetry attribution.
    pub user_id: Option<String>,
    /// Upstream deadline; aborts in-flight provider calls and backoff waits.
    pub deadline: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

impl GenerationRequest {
    pub fn builder(section: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(section)
    }
}

/// Builder for [`GenerationRequest`].
#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    system_prompt: String,
    user_prompt: String,
    schema: Value,
    tier: Tier,
    section: String,
    mode: GenerationMode,
    user_id: Option<String>,
    deadline: Option<Duration>,
    failure_policy: FailurePolicy,
}

impl GenerationRequestBuilder {
    fn new(section: impl Into<String>) -> Self {
        Self {
            system_prompt: String::new(),
            user_prompt: String::new(),
            schema: Value::Null,
            tier: Tier::Free,
            section: section.into(),
            mode: GenerationMode::Fast,
            user_id: None,
            deadline: None,
            failure_policy: FailurePolicy::Propagate,
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.user_prompt = prompt.into();
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn build(self) -> GenerationRequest {
        GenerationRequest {
            system_prompt: self.system_prompt,
            user_prompt: self.user_prompt,
            schema: self.schema,
            tier: self.tier,
            section: self.section,
            mode: self.mode,
            user_id: self.user_id,
            deadline: self.deadline,
            failure_policy: self.failure_policy,
        }
    }
}

// =============================================================================
// Report Period
// =============================================================================

/// Reporting window for reflective summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tracking Metadata
// =============================================================================

/// Dev-only provenance attached to generated payloads under the
/// `_tracking` key. Never affects business logic; the storage layer strips
/// it before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingMetadata {
    pub request_id: Uuid,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl TrackingMetadata {
    /// Key under which tracking metadata is attached to result objects.
    pub const KEY: &'static str = "_tracking";

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            model: model.into(),
            generated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
