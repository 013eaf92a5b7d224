//! Retry/Backoff & Model-Tier Selector
//!
//! Model selection maps (membership tier × generation mode) onto an ordered
//! candidate list; the retry loop walks that list with a bounded number of
//! attempts per model and exponential backoff between attempts.
//!
//! The loop is an explicit state machine over first-class attempt/backoff
//! values instead of nested loops with inline sleeps: the delay is an
//! injected collaborator so unit tests run without wall-clock waits.
//!
//! Quota errors short-circuit the whole call — they are never retried here;
//! the caller decides whether to surface them to the user.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use crate::constants::{models as model_constants, retry as retry_constants};
use crate::types::{GenerationMode, RecapError, Result, Tier};

// =============================================================================
// Model Selection
// =============================================================================

/// Resolved model plan for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPlan {
    /// Candidate models in attempt order.
    pub models: Vec<String>,
    /// Output token ceiling; `None` means unbounded (Pro tier).
    pub max_output_tokens: Option<u32>,
}

/// Maps tier × mode to a model plan.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub fast_model: String,
    pub fast_fallback_model: String,
    pub reasoning_model: String,
    pub free_max_output_tokens: u32,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self {
            fast_model: model_constants::FAST_MODEL.to_string(),
            fast_fallback_model: model_constants::FAST_FALLBACK_MODEL.to_string(),
            reasoning_model: model_constants::REASONING_MODEL.to_string(),
            free_max_output_tokens: model_constants::FREE_MAX_OUTPUT_TOKENS,
        }
    }
}

impl ModelSelector {
    /// Free always gets the cheap model with a bounded output ceiling.
    /// Pro gets the cheap model too unless the call asks for reasoning.
    pub fn select(&self, tier: Tier, mode: GenerationMode) -> ModelPlan {
        match (tier, mode) {
            (Tier::Free, _) => ModelPlan {
                models: vec![self.fast_model.clone(), self.fast_fallback_model.clone()],
                max_output_tokens: Some(self.free_max_output_tokens),
            },
            (Tier::Pro, GenerationMode::Fast) => ModelPlan {
                models: vec![self.fast_model.clone(), self.fast_fallback_model.clone()],
                max_output_tokens: None,
            },
            (Tier::Pro, GenerationMode::Reasoned) => ModelPlan {
                models: vec![self.reasoning_model.clone(), self.fast_model.clone()],
                max_output_tokens: None,
            },
        }
    }
}

// =============================================================================
// Delay Collaborator
// =============================================================================

/// Backoff sleep, injectable so tests run deterministically.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production delay backed by the tokio timer.
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// No-op delay for tests.
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn sleep(&self, _duration: Duration) {}
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Attempt and backoff bounds for one generation call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts_per_model: u8,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts_per_model: retry_constants::MAX_ATTEMPTS_PER_MODEL,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_delay: Duration::from_millis(retry_constants::MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the next attempt on the same model:
    /// `min(base * 2^(attempt-1), max)` where `attempt` is 1-based.
    pub fn delay_for_attempt(&self, attempt: u8) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << exp);
        delay.min(self.max_delay)
    }
}

/// Random jitter up to a quarter of the base delay, so concurrent callers
/// hitting the same transient failure don't retry in lockstep.
fn random_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = (delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_jitter_ms))
}

// =============================================================================
// Attempt Records
// =============================================================================

/// Outcome of a single attempt, kept for in-call bookkeeping and summarized
/// into telemetry when the call completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failed { code: &'static str, retryable: bool },
}

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub model: String,
    pub attempt: u8,
    pub outcome: AttemptOutcome,
    pub latency_ms: u64,
}

// =============================================================================
// Retry Runner
// =============================================================================

/// Drives attempts across the model plan. The retried unit is the whole
/// invoke → parse → unwrap pipeline, supplied as `attempt_fn`, so shape
/// drift and malformed output count as retryable failures alongside
/// transport errors.
pub struct RetryRunner<'a> {
    policy: RetryPolicy,
    delay: &'a dyn Delay,
}

impl<'a> RetryRunner<'a> {
    pub fn new(policy: RetryPolicy, delay: &'a dyn Delay) -> Self {
        Self { policy, delay }
    }

    pub async fn run<T, F, Fut>(
        &self,
        models: &[String],
        mut attempt_fn: F,
    ) -> (Result<T>, Vec<AttemptRecord>)
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut records = Vec::new();
        let mut last_error: Option<RecapError> = None;

        'models: for model in models {
            for attempt in 1..=self.policy.attempts_per_model {
                let start = Instant::now();
                debug!(model = %model, attempt, "Generation attempt");

                match attempt_fn(model.clone()).await {
                    Ok(value) => {
                        records.push(AttemptRecord {
                            model: model.clone(),
                            attempt,
                            outcome: AttemptOutcome::Success,
                            latency_ms: start.elapsed().as_millis() as u64,
                        });
                        return (Ok(value), records);
                    }
                    Err(err) => {
                        let retryable = err.is_retryable();
                        records.push(AttemptRecord {
                            model: model.clone(),
                            attempt,
                            outcome: AttemptOutcome::Failed {
                                code: err.code(),
                                retryable,
                            },
                            latency_ms: start.elapsed().as_millis() as u64,
                        });

                        warn!(
                            model = %model,
                            attempt,
                            code = err.code(),
                            retryable,
                            "Attempt failed"
                        );

                        if matches!(err, RecapError::QuotaExceeded(_)) {
                            // Quota is terminal for the whole call.
                            return (Err(err), records);
                        }

                        if !retryable {
                            return (Err(err), records);
                        }

                        last_error = Some(err);

                        if attempt < self.policy.attempts_per_model {
                            let backoff = self.policy.delay_for_attempt(attempt);
                            let wait = backoff + random_jitter(backoff);
                            debug!(wait_ms = wait.as_millis() as u64, "Backing off");
                            self.delay.sleep(wait).await;
                        } else {
                            continue 'models;
                        }
                    }
                }
            }
        }

        let err = last_error
            .unwrap_or_else(|| RecapError::transport("No candidate models configured"));
        (Err(err), records)
    }
}

// =============================================================================
// Tests
// =============================================================================
