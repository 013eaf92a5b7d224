//! Gemini API Provider
//!
//! HTTP provider against the `generateContent` endpoint with constrained
//! JSON output (`responseMimeType` + `responseSchema`). Returns
//! [`RawResponse`] with token usage parsed from `usageMetadata`.
//!
//! Quota exhaustion (HTTP 429 or `RESOURCE_EXHAUSTED` bodies) is classified
//! as `QuotaExceeded`; other HTTP failures become transport errors carrying
//! the status code.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::{ModelCall, ModelProvider, ProviderConfig, RawResponse, TokenUsage};
use crate::constants::network as net_constants;
use crate::types::{ErrorClassifier, RecapError, Result};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider with secure API key handling.
pub struct GeminiProvider {
    /// Stored securely; never exposed in logs or debug output.
    api_key: SecretString,
    api_base: String,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                RecapError::Config(
                    "Gemini API key not found. Set GEMINI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Url::parse(&api_base)
            .map_err(|e| RecapError::Config(format!("Invalid API base URL '{}': {}", api_base, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| RecapError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            temperature: config.temperature,
            client,
        })
    }

    fn build_request(&self, call: &ModelCall<'_>) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: call.system_prompt.to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: call.user_prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json".to_string(),
                response_schema: (!call.schema.is_null()).then(|| call.schema.clone()),
                max_output_tokens: call.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn generate(&self, call: &ModelCall<'_>) -> Result<RawResponse> {
        debug!(model = call.model, "Sending generateContent request");

        let url = format!("{}/models/{}:generateContent", self.api_base, call.model);
        let request = self.build_request(call);
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_message(&e.to_string()))?;

        let latency = start.elapsed();
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(model = call.model, status = status.as_u16(), "Provider call failed");
            return Err(ErrorClassifier::classify_http(status.as_u16(), &body));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| RecapError::transport(format!("Failed to read provider response: {}", e)))?;

        let usage = body
            .usage_metadata
            .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RecapError::transport("Empty response content"))?;

        info!(
            model = call.model,
            latency_ms = latency.as_millis() as u64,
            total_tokens = usage.total_tokens,
            "Provider call succeeded"
        );

        Ok(RawResponse {
            text,
            usage,
            latency,
            model: call.model.to_string(),
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                warn!("Gemini health check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}
