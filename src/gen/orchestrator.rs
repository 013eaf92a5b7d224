//! Generation Orchestrator
//!
//! The only component callers invoke. Composes the full pipeline:
//!
//! cache lookup → prompt augmentation → schema sanitization → provider
//! call under retry/backoff → repair-parse → unwrap → post-condition →
//! cache write-through → fire-and-forget telemetry.
//!
//! All failures are normalized into the crate error taxonomy before they
//! cross this boundary. Call sites either let the typed error propagate
//! ([`Orchestrator::generate`]) or declare a fallback and never see an
//! error at all ([`Orchestrator::generate_or_fallback`]).

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::cache::{cache_key, MemoryCache, SharedCache};
use super::fallback::{InsightContext, InsightFallback};
use super::provider::{ModelCall, SharedProvider, TokenUsage};
use super::repair::parse_robust;
use super::retry::{Delay, ModelSelector, RetryPolicy, RetryRunner, TokioDelay};
use super::schema::SchemaSanitizer;
use super::telemetry::{dispatch, SharedTelemetry, TracingTelemetry, UsageEvent};
use super::timeout::with_deadline;
use super::unwrap::unwrap_payload;
use crate::config::{Config, Environment};
use crate::types::{GenerationRequest, Result, Tier, TrackingMetadata};

// =============================================================================
// Prompt Augmentation
// =============================================================================

/// Process-wide prompt augmentation policy, treated as an external
/// collaborator: a pure function of (prompt, tier).
pub trait PromptAugmenter: Send + Sync {
    fn augment(&self, prompt: &str, tier: Tier) -> String;
}

/// Identity augmenter (default).
pub struct NoAugmentation;

impl PromptAugmenter for NoAugmentation {
    fn augment(&self, prompt: &str, _tier: Tier) -> String {
        prompt.to_string()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Structured generation orchestrator.
pub struct Orchestrator {
    provider: SharedProvider,
    cache: SharedCache,
    telemetry: SharedTelemetry,
    augmenter: Arc<dyn PromptAugmenter>,
    sanitizer: SchemaSanitizer,
    selector: ModelSelector,
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
    environment: Environment,
}

/// Result of one successful attempt: the unwrapped payload plus the usage
/// to bill against it.
struct AttemptSuccess {
    payload: Value,
    usage: TokenUsage,
    model: String,
}

impl Orchestrator {
    pub fn builder(provider: SharedProvider) -> OrchestratorBuilder {
        OrchestratorBuilder::new(provider)
    }

    /// Generate a structured payload for the request.
    ///
    /// A cache hit returns immediately with no provider call and no
    /// telemetry. Otherwise the full pipeline runs; on success the result
    /// is written through to the cache before tracking metadata (dev only)
    /// is attached to the returned copy.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        let key = cache_key(&request.system_prompt, &request.user_prompt, request.tier);

        if let Some(cached) = self.cache.get(&key).await {
            debug!(section = %request.section, "cache hit");
            return Ok(cached);
        }

        let system_prompt = self
            .augmenter
            .augment(&request.system_prompt, request.tier);

        // Sanitization failures are caller bugs; fail the whole call
        // before any provider attempt.
        let schema = if request.schema.is_null() {
            Value::Null
        } else {
            self.sanitizer.sanitize(&request.schema)?
        };

        let plan = self.selector.select(request.tier, request.mode);
        let start = Instant::now();

        let runner = RetryRunner::new(self.policy.clone(), self.delay.as_ref());
        let attempt_fn = |model: String| {
            let provider = Arc::clone(&self.provider);
            let system_prompt = system_prompt.clone();
            let user_prompt = request.user_prompt.clone();
            let schema = schema.clone();
            let section = request.section.clone();
            let max_output_tokens = plan.max_output_tokens;

            async move {
                let call = ModelCall {
                    model: &model,
                    system_prompt: &system_prompt,
                    user_prompt: &user_prompt,
                    schema: &schema,
                    max_output_tokens,
                };
                let raw = provider.generate(&call).await?;
                let (parsed, _repaired) = parse_robust(&raw.text)?;
                let payload = unwrap_payload(parsed, &section)?;
                Ok(AttemptSuccess {
                    payload,
                    usage: raw.usage,
                    model: raw.model,
                })
            }
        };

        let run = async { Ok(runner.run(&plan.models, attempt_fn).await) };
        let (outcome, records) = match with_deadline(request.deadline, run, "generation").await {
            Ok(pair) => pair,
            Err(timeout) => (Err(timeout), Vec::new()),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(success) => {
                self.cache.set(&key, success.payload.clone()).await;

                dispatch(
                    Arc::clone(&self.telemetry),
                    UsageEvent {
                        user_id: request.user_id.clone(),
                        model: success.model.clone(),
                        section: request.section.clone(),
                        usage: success.usage,
                        duration_ms,
                        success: true,
                        error: None,
                    },
                );

                info!(
                    section = %request.section,
                    model = %success.model,
                    attempts = records.len(),
                    duration_ms,
                    "generation succeeded"
                );

                Ok(self.attach_tracking(success.payload, &success.model))
            }
            Err(err) => {
                let model = records
                    .last()
                    .map(|r| r.model.clone())
                    .unwrap_or_else(|| "unselected".to_string());

                dispatch(
                    Arc::clone(&self.telemetry),
                    UsageEvent {
                        user_id: request.user_id.clone(),
                        model,
                        section: request.section.clone(),
                        usage: TokenUsage::default(),
                        duration_ms,
                        success: false,
                        error: Some(err.to_string()),
                    },
                );

                warn!(
                    section = %request.section,
                    attempts = records.len(),
                    code = err.code(),
                    "generation failed"
                );

                Err(err)
            }
        }
    }

    /// Generate, handing exhausted failures to the fallback composer.
    /// Never fails; the insight call sites must return something usable.
    pub async fn generate_or_fallback(
        &self,
        request: &GenerationRequest,
        context: &InsightContext,
    ) -> Value {
        match self.generate(request).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    section = %request.section,
                    code = err.code(),
                    "generation exhausted, composing fallback"
                );
                InsightFallback::compose(context)
            }
        }
    }

    /// Generate and deserialize into a caller type.
    pub async fn generate_as<T: DeserializeOwned>(&self, request: &GenerationRequest) -> Result<T> {
        let payload = self.generate(request).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Attach dev-only tracking metadata under `_tracking`. The storage
    /// collaborator strips it before persistence.
    fn attach_tracking(&self, mut payload: Value, model: &str) -> Value {
        if self.environment.is_production() {
            return payload;
        }

        if let Value::Object(obj) = &mut payload {
            if let Ok(tracking) = serde_json::to_value(TrackingMetadata::new(model)) {
                obj.insert(TrackingMetadata::KEY.to_string(), tracking);
            }
        }
        payload
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct OrchestratorBuilder {
    provider: SharedProvider,
    cache: Option<SharedCache>,
    telemetry: Option<SharedTelemetry>,
    augmenter: Option<Arc<dyn PromptAugmenter>>,
    sanitizer: SchemaSanitizer,
    selector: ModelSelector,
    policy: RetryPolicy,
    delay: Option<Arc<dyn Delay>>,
    environment: Environment,
}

impl OrchestratorBuilder {
    fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            cache: None,
            telemetry: None,
            augmenter: None,
            sanitizer: SchemaSanitizer::default(),
            selector: ModelSelector::default(),
            policy: RetryPolicy::default(),
            delay: None,
            environment: Environment::Production,
        }
    }

    /// Apply model names, retry tuning, and environment from configuration.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.selector = ModelSelector {
            fast_model: config.generation.fast_model.clone(),
            fast_fallback_model: config.generation.fast_fallback_model.clone(),
            reasoning_model: config.generation.reasoning_model.clone(),
            free_max_output_tokens: config.generation.free_max_output_tokens,
        };
        self.policy = RetryPolicy {
            attempts_per_model: config.generation.attempts_per_model,
            base_delay: std::time::Duration::from_millis(config.generation.base_delay_ms),
            max_delay: std::time::Duration::from_millis(config.generation.max_delay_ms),
        };
        self.environment = config.environment;
        self
    }

    pub fn cache(mut self, cache: SharedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn telemetry(mut self, telemetry: SharedTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn augmenter(mut self, augmenter: Arc<dyn PromptAugmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    pub fn sanitizer(mut self, sanitizer: SchemaSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn selector(mut self, selector: ModelSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            provider: self.provider,
            cache: self.cache.unwrap_or_else(MemoryCache::shared),
            telemetry: self.telemetry.unwrap_or_else(|| Arc::new(TracingTelemetry)),
            augmenter: self.augmenter.unwrap_or_else(|| Arc::new(NoAugmentation)),
            sanitizer: self.sanitizer,
            selector: self.selector,
            policy: self.policy,
            delay: self.delay.unwrap_or_else(|| Arc::new(TokioDelay)),
            environment: self.environment,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::provider::{ModelProvider, RawResponse};
    use crate::gen::retry::NoDelay;
    use crate::gen::telemetry::UsageCollector;
    use crate::types::RecapError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Provider stub that replays scripted responses in order, then
    /// repeats the last one.
    struct ScriptedProvider {
        responses: Vec<Result<String>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses,
                calls: AtomicU32::new(0),
            })
        }

        fn ok(text: &str) -> Arc<Self> {
            Self::new(vec![Ok(text.to_string())])
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        async fn generate(&self, call: &ModelCall<'_>) -> Result<RawResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let idx = n.min(self.responses.len().saturating_sub(1));
            match &self.responses[idx] {
                Ok(text) => Ok(RawResponse {
                    text: text.clone(),
                    usage: TokenUsage::new(50, 20),
                    latency: Duration::from_millis(10),
                    model: call.model.to_string(),
                }),
                Err(err) => Err(clone_error(err)),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn clone_error(err: &RecapError) -> RecapError {
        match err {
            RecapError::QuotaExceeded(m) => RecapError::QuotaExceeded(m.clone()),
            other => RecapError::transport(other.to_string()),
        }
    }

    fn orchestrator(provider: Arc<ScriptedProvider>) -> Orchestrator {
        Orchestrator::builder(provider)
            .delay(Arc::new(NoDelay))
            .build()
    }

    fn request() -> GenerationRequest {
        GenerationRequest::builder("daily_summary")
            .system_prompt("You write reflective summaries.")
            .user_prompt("Entries: slept well, ran 5k.")
            .schema(json!({
                "type": "object",
                "properties": {"summary": {"type": "string"}},
                "required": ["summary"]
            }))
            .build()
    }

    #[tokio::test]
    async fn test_success_pipeline_unwraps_wrapper() {
        let provider = ScriptedProvider::ok(r#"{"daily_summary": {"summary": "a good day"}}"#);
        let orch = orchestrator(provider.clone());

        let payload = orch.generate(&request()).await.unwrap();
        assert_eq!(payload["summary"], "a good day");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider_and_telemetry() {
        let provider = ScriptedProvider::ok(r#"{"summary": "cached day"}"#);
        let collector = UsageCollector::shared();
        let orch = Orchestrator::builder(provider.clone())
            .delay(Arc::new(NoDelay))
            .telemetry(collector.clone())
            .build();

        let req = request();
        let first = orch.generate(&req).await.unwrap();
        let second = orch.generate(&req).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.call_count(), 1);

        // Let the single telemetry dispatch land; a hit must not add one.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(collector.snapshot().calls, 1);
    }

    #[tokio::test]
    async fn test_tier_partitioned_cache() {
        let provider = ScriptedProvider::new(vec![
            Ok(r#"{"summary": "free answer"}"#.to_string()),
            Ok(r#"{"summary": "pro answer"}"#.to_string()),
        ]);
        let orch = orchestrator(provider.clone());

        let free_req = request();
        let mut pro_req = request();
        pro_req.tier = Tier::Pro;

        let free = orch.generate(&free_req).await.unwrap();
        let pro = orch.generate(&pro_req).await.unwrap();

        assert_eq!(free["summary"], "free answer");
        assert_eq!(pro["summary"], "pro answer");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_then_recovered_on_retry() {
        let provider = ScriptedProvider::new(vec![
            Ok("this is not json {{{".to_string()),
            Ok(r#"{"summary": "second try"}"#.to_string()),
        ]);
        let orch = orchestrator(provider.clone());

        let payload = orch.generate(&request()).await.unwrap();
        assert_eq!(payload["summary"], "second try");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_schema_error_fails_before_provider() {
        let provider = ScriptedProvider::ok(r#"{"summary": "x"}"#);
        let orch = orchestrator(provider.clone());

        let mut req = request();
        req.schema = json!({
            "type": "object",
            "properties": {"summary": {"type": "string"}},
            "required": ["summary", "missing_field"]
        });

        let err = orch.generate(&req).await.unwrap_err();
        assert!(matches!(err, RecapError::SchemaValidation(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_quota_propagates_with_stable_code() {
        let provider =
            ScriptedProvider::new(vec![Err(RecapError::QuotaExceeded("limit".into()))]);
        let orch = orchestrator(provider.clone());

        let err = orch.generate(&request()).await.unwrap_err();
        assert_eq!(err.code(), "QUOTA_EXCEEDED");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_failure_emits_failure_telemetry() {
        let provider =
            ScriptedProvider::new(vec![Err(RecapError::transport("always down"))]);
        let collector = UsageCollector::shared();
        let orch = Orchestrator::builder(provider)
            .delay(Arc::new(NoDelay))
            .telemetry(collector.clone())
            .build();

        let err = orch.generate(&request()).await.unwrap_err();
        assert!(err.is_retryable());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let summary = collector.snapshot();
        assert_eq!(summary.calls, 1);
        assert_eq!(summary.failures, 1);
    }

    #[tokio::test]
    async fn test_fallback_engages_on_exhaustion() {
        let provider =
            ScriptedProvider::new(vec![Err(RecapError::transport("always down"))]);
        let orch = orchestrator(provider);

        let context = InsightContext {
            summary: Some("Earlier this week you kept a steady routine.".to_string()),
            ..Default::default()
        };

        let payload = orch
            .generate_or_fallback(&request(), &context)
            .await;

        assert_eq!(payload["degraded"], true);
        assert_eq!(
            payload["insight"],
            "Earlier this week you kept a steady routine."
        );
    }

    #[tokio::test]
    async fn test_tracking_attached_only_in_development() {
        let provider = ScriptedProvider::ok(r#"{"summary": "tracked"}"#);
        let dev = Orchestrator::builder(provider)
            .delay(Arc::new(NoDelay))
            .environment(Environment::Development)
            .build();

        let payload = dev.generate(&request()).await.unwrap();
        assert!(payload.get(TrackingMetadata::KEY).is_some());

        let provider = ScriptedProvider::ok(r#"{"summary": "untracked"}"#);
        let prod = orchestrator(provider);
        let payload = prod.generate(&request()).await.unwrap();
        assert!(payload.get(TrackingMetadata::KEY).is_none());
    }

    #[tokio::test]
    async fn test_cached_value_has_no_tracking() {
        // Tracking is attached to the returned copy after the cache write,
        // so cached entries stay clean.
        let provider = ScriptedProvider::ok(r#"{"summary": "clean"}"#);
        let cache = MemoryCache::shared();
        let orch = Orchestrator::builder(provider)
            .delay(Arc::new(NoDelay))
            .cache(Arc::clone(&cache))
            .environment(Environment::Development)
            .build();

        let req = request();
        let returned = orch.generate(&req).await.unwrap();
        assert!(returned.get(TrackingMetadata::KEY).is_some());

        let key = cache_key(&req.system_prompt, &req.user_prompt, req.tier);
        let cached = cache.get(&key).await.unwrap();
        assert!(cached.get(TrackingMetadata::KEY).is_none());
    }

    #[tokio::test]
    async fn test_deadline_aborts_generation() {
        struct SlowProvider;

        #[async_trait]
        impl ModelProvider for SlowProvider {
            async fn generate(&self, _call: &ModelCall<'_>) -> Result<RawResponse> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(RecapError::transport("unreachable"))
            }
            fn name(&self) -> &str {
                "slow"
            }
            async fn health_check(&self) -> Result<bool> {
                Ok(true)
            }
        }

        let orch = Orchestrator::builder(Arc::new(SlowProvider))
            .delay(Arc::new(NoDelay))
            .build();

        let mut req = request();
        req.deadline = Some(Duration::from_millis(20));

        let err = orch.generate(&req).await.unwrap_err();
        assert!(matches!(err, RecapError::Timeout { .. }));
    }
}
