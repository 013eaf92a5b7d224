//! Structured Generation
//!
//! Everything between a report section's prompt and its validated JSON
//! payload: schema sanitization, robust parsing, envelope unwrapping,
//! caching, retry/backoff across a model plan, usage telemetry, and the
//! orchestrator that composes them.

pub mod cache;
pub mod fallback;
pub mod orchestrator;
pub mod provider;
pub mod repair;
pub mod retry;
pub mod schema;
pub mod telemetry;
pub mod timeout;
pub mod unwrap;

pub use cache::{cache_key, GenerationCache, MemoryCache, SharedCache};
pub use fallback::{InsightContext, InsightFallback};
pub use orchestrator::{NoAugmentation, Orchestrator, OrchestratorBuilder, PromptAugmenter};
pub use provider::{
    GeminiProvider, ModelCall, ModelProvider, ProviderConfig, RawResponse, SharedProvider,
    TokenUsage,
};
pub use repair::parse_robust;
pub use retry::{
    AttemptOutcome, AttemptRecord, Delay, ModelPlan, ModelSelector, NoDelay, RetryPolicy,
    RetryRunner, TokioDelay,
};
pub use schema::SchemaSanitizer;
pub use telemetry::{
    dispatch, SharedTelemetry, TelemetrySink, TracingTelemetry, UsageCollector, UsageEvent,
    UsageSummary,
};
pub use timeout::with_deadline;
pub use unwrap::unwrap_payload;
