//! Opt-in cache of transient indexes keyed by query fingerprint

use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::config::IndexCacheConfig;
use crate::retrieval::TransientIndex;

/// SHA-256 of the normalized query (trimmed, lower-cased, whitespace collapsed)
pub fn query_fingerprint(query: &str) -> String {
    let normalized = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Bounded, expiring map from query fingerprint to built index
pub struct IndexCache {
    entries: Cache<String, Arc<TransientIndex>>,
}

impl IndexCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity.max(1) as u64)
                .build(),
        }
    }

    /// `None` unless caching is enabled in config
    pub fn from_config(config: &IndexCacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.ttl, config.capacity))
    }

    pub async fn get(&self, query: &str) -> Option<Arc<TransientIndex>> {
        self.entries.get(&query_fingerprint(query)).await
    }

    pub async fn insert(&self, query: &str, index: Arc<TransientIndex>) {
        self.entries.insert(query_fingerprint(query), index).await;
    }

    /// Drop the entry for one query
    pub async fn invalidate(&self, query: &str) -> bool {
        self.entries.remove(&query_fingerprint(query)).await.is_some()
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Live entries after pending evictions are applied
    pub async fn len(&self) -> usize {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_normalizes() {
        assert_eq!(
            query_fingerprint("  Transformer   Attention "),
            query_fingerprint("transformer attention")
        );
        assert_ne!(
            query_fingerprint("transformer attention"),
            query_fingerprint("transformer")
        );
        assert_eq!(query_fingerprint("x").len(), 64);
    }

    #[test]
    fn test_disabled_by_default() {
        assert!(IndexCache::from_config(&IndexCacheConfig::default()).is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = IndexCache::new(Duration::from_millis(50), 4);
        cache.insert("query", Arc::new(TransientIndex::new())).await;

        assert!(cache.get("QUERY").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("query").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = IndexCache::new(Duration::from_secs(600), 2);
        for query in ["first", "second", "third", "fourth"] {
            cache.insert(query, Arc::new(TransientIndex::new())).await;
        }

        assert!(cache.len().await <= 2);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = IndexCache::new(Duration::from_secs(600), 4);
        cache.insert("a", Arc::new(TransientIndex::new())).await;
        cache.insert("b", Arc::new(TransientIndex::new())).await;

        assert!(cache.invalidate("a").await);
        assert!(!cache.invalidate("a").await);
        cache.clear();
        assert!(cache.get("b").await.is_none());
    }
}
