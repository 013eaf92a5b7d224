//! Usage Telemetry
//!
//! Fire-and-forget telemetry for generation calls. Emission is dispatched
//! as background work and never fails the caller; a sink that errors gets
//! logged and forgotten.
//!
//! Two sinks ship in-crate: [`TracingTelemetry`] logs events through the
//! tracing subscriber, and [`UsageCollector`] aggregates process-wide
//! counters with atomics for minimal contention under concurrent calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::{debug, info};

use super::provider::TokenUsage;

// =============================================================================
// Usage Event
// =============================================================================

/// One generation call's telemetry, keyed by (user, model, section).
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub user_id: Option<String>,
    pub model: String,
    pub section: String,
    pub usage: TokenUsage,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

// =============================================================================
// Telemetry Sink
// =============================================================================

/// Telemetry collaborator; no return value is consumed.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record(&self, event: UsageEvent);
}

/// Shared sink handle.
pub type SharedTelemetry = Arc<dyn TelemetrySink>;

/// Dispatch an event without blocking the caller's result. Sink failures
/// are the sink's problem; nothing propagates back.
pub fn dispatch(sink: SharedTelemetry, event: UsageEvent) {
    tokio::spawn(async move {
        sink.record(event).await;
    });
}

// =============================================================================
// Tracing Sink
// =============================================================================

/// Default sink: structured log lines through `tracing`.
pub struct TracingTelemetry;

#[async_trait]
impl TelemetrySink for TracingTelemetry {
    async fn record(&self, event: UsageEvent) {
        if event.success {
            info!(
                user = event.user_id.as_deref().unwrap_or("-"),
                model = %event.model,
                section = %event.section,
                prompt_tokens = event.usage.prompt_tokens,
                completion_tokens = event.usage.completion_tokens,
                duration_ms = event.duration_ms,
                "generation usage"
            );
        } else {
            info!(
                user = event.user_id.as_deref().unwrap_or("-"),
                model = %event.model,
                section = %event.section,
                duration_ms = event.duration_ms,
                error = event.error.as_deref().unwrap_or("unknown"),
                "generation failed"
            );
        }
    }
}

// =============================================================================
// Aggregate Collector
// =============================================================================

/// Thread-safe aggregate of generation usage across a process.
#[derive(Default)]
pub struct UsageCollector {
    calls: AtomicU32,
    successes: AtomicU32,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_duration_ms: AtomicU64,
}

/// Snapshot of aggregated usage.
#[derive(Debug, Clone)]
pub struct UsageSummary {
    pub calls: u32,
    pub successes: u32,
    pub failures: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub avg_duration_ms: f64,
}

impl UsageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn snapshot(&self) -> UsageSummary {
        let calls = self.calls.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);
        let total_duration = self.total_duration_ms.load(Ordering::Relaxed);

        UsageSummary {
            calls,
            successes,
            failures: calls.saturating_sub(successes),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            avg_duration_ms: if calls > 0 {
                total_duration as f64 / calls as f64
            } else {
                0.0
            },
        }
    }
}

#[async_trait]
impl TelemetrySink for UsageCollector {
    async fn record(&self, event: UsageEvent) {
        debug!(section = %event.section, success = event.success, "recording usage");

        self.calls.fetch_add(1, Ordering::Relaxed);
        if event.success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        }
        self.prompt_tokens
            .fetch_add(event.usage.prompt_tokens as u64, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(event.usage.completion_tokens as u64, Ordering::Relaxed);
        self.total_duration_ms
            .fetch_add(event.duration_ms, Ordering::Relaxed);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(success: bool) -> UsageEvent {
        UsageEvent {
            user_id: Some("user-1".to_string()),
            model: "flash".to_string(),
            section: "daily_summary".to_string(),
            usage: TokenUsage::new(100, 40),
            duration_ms: 800,
            success,
            error: (!success).then(|| "transport".to_string()),
        }
    }

    #[tokio::test]
    async fn test_collector_aggregates() {
        let collector = UsageCollector::new();
        collector.record(event(true)).await;
        collector.record(event(true)).await;
        collector.record(event(false)).await;

        let summary = collector.snapshot();
        assert_eq!(summary.calls, 3);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.prompt_tokens, 300);
        assert_eq!(summary.total_tokens, 420);
        assert!((summary.avg_duration_ms - 800.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_dispatch_does_not_block_caller() {
        let collector = UsageCollector::shared();
        let sink: SharedTelemetry = collector.clone();

        dispatch(sink, event(true));

        // Dispatch is fire-and-forget; yield so the spawned task runs.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(collector.snapshot().calls <= 1);
    }

    #[tokio::test]
    async fn test_concurrent_recording() {
        let collector = UsageCollector::shared();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let c = Arc::clone(&collector);
                tokio::spawn(async move {
                    for _ in 0..100 {
                        c.record(event(true)).await;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let summary = collector.snapshot();
        assert_eq!(summary.calls, 1000);
        assert_eq!(summary.prompt_tokens, 100_000);
    }
}
