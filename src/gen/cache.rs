//! Generation Cache
//!
//! External-facing cache contract plus an in-memory implementation.
//!
//! Keys combine hashes of both prompts with the membership tier so Free and
//! Pro users never share a cached answer — the tiers receive materially
//! different prompts and models. A cache hit short-circuits the entire
//! pipeline, including cost telemetry.
//!
//! TTL and eviction are the embedder's concern: any store satisfying the
//! trait works as long as tier-partitioned keys are respected. The bundled
//! [`MemoryCache`] is unbounded and intended for tests and short-lived
//! processes.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::constants::cache as cache_constants;
use crate::types::Tier;

// =============================================================================
// Cache Contract
// =============================================================================

/// Cache collaborator: concurrent reads, last-writer-wins writes.
/// A duplicate identical write is harmless given the same key.
#[async_trait]
pub trait GenerationCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value);
}

/// Shared cache handle passed into the orchestrator.
pub type SharedCache = Arc<dyn GenerationCache>;

/// Derive the cache key for a prompt pair and tier:
/// `sha256(system)[..16] + sha256(user)[..16] + "_" + tier`.
pub fn cache_key(system_prompt: &str, user_prompt: &str, tier: Tier) -> String {
    format!(
        "{}{}_{}",
        hash_prefix(system_prompt),
        hash_prefix(user_prompt),
        tier.cache_suffix()
    )
}

fn hash_prefix(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(cache_constants::HASH_PREFIX_LEN)
        .collect()
}

// =============================================================================
// In-Memory Cache
// =============================================================================

/// Lock-free in-memory cache backed by DashMap.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Value>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCache {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl GenerationCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    async fn set(&self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_partitions_tiers() {
        let free = cache_key("sys", "user", Tier::Free);
        let pro = cache_key("sys", "user", Tier::Pro);

        assert_ne!(free, pro);
        assert!(free.ends_with("_free"));
        assert!(pro.ends_with("_pro"));
        // Same hash material before the tier suffix.
        assert_eq!(
            free.trim_end_matches("_free"),
            pro.trim_end_matches("_pro")
        );
    }

    #[test]
    fn test_cache_key_sensitive_to_both_prompts() {
        let base = cache_key("sys", "user", Tier::Free);
        assert_ne!(base, cache_key("sys2", "user", Tier::Free));
        assert_ne!(base, cache_key("sys", "user2", Tier::Free));
    }

    #[tokio::test]
    async fn test_tier_isolation() {
        let cache = MemoryCache::new();
        let key_free = cache_key("sys", "user", Tier::Free);
        let key_pro = cache_key("sys", "user", Tier::Pro);

        cache.set(&key_free, json!({"summary": "A"})).await;
        cache.set(&key_pro, json!({"summary": "B"})).await;

        assert_eq!(cache.get(&key_free).await.unwrap()["summary"], "A");
        assert_eq!(cache.get(&key_pro).await.unwrap()["summary"], "B");
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let cache = MemoryCache::new();
        cache.set("k", json!({"v": 1})).await;
        cache.set("k", json!({"v": 2})).await;
        assert_eq!(cache.get("k").await.unwrap()["v"], 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_miss_returns_none() {
        let cache = MemoryCache::new();
        assert!(cache.get("absent").await.is_none());
    }
}
