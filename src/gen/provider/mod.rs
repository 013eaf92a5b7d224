//! Model Provider Abstraction
//!
//! Defines the [`ModelProvider`] trait the retry loop drives. Providers
//! accept a system instruction, a user message, and a constrained response
//! schema, and return raw text plus token-usage metadata. Schema keyword
//! support differs between providers; the orchestrator sanitizes the schema
//! before it reaches this layer.

mod gemini;

pub use gemini::GeminiProvider;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Result;

// =============================================================================
// Provider Response
// =============================================================================

/// Token usage metadata for a single provider call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Raw provider output: text payload plus usage and latency. Ephemeral;
/// survives only long enough to be parsed and summarized into telemetry.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub latency: Duration,
    pub model: String,
}

// =============================================================================
// Model Call
// =============================================================================

/// One provider invocation, fully resolved (model chosen, schema sanitized,
/// prompts augmented).
#[derive(Debug, Clone)]
pub struct ModelCall<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub schema: &'a Value,
    /// Output token ceiling; `None` means provider default (Pro tier).
    pub max_output_tokens: Option<u32>,
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Generative model collaborator.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Invoke the model. Implementations classify their own failures into
    /// the crate error taxonomy; no raw HTTP or JSON errors escape.
    async fn generate(&self, call: &ModelCall<'_>) -> Result<RawResponse>;

    /// Provider name for logging and telemetry.
    fn name(&self) -> &str;

    /// Check whether the provider is reachable.
    async fn health_check(&self) -> Result<bool>;
}

/// Shared provider handle for concurrent generation calls.
pub type SharedProvider = Arc<dyn ModelProvider>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for the HTTP provider.
///
/// API keys are never serialized to output and are redacted in debug
/// output; the provider converts the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; falls back to the `GEMINI_API_KEY` env var.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints / proxies).
    #[serde(default)]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: f32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            timeout_secs: crate::constants::network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
        }
    }
}
