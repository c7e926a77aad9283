//! `ModelCache`: an LRU, count- and cost-bounded cache of loaded on-device
//! model containers, keyed by model-id string.

use crate::lru_cache::{CacheStats, Costed, LruCache};
use async_trait::async_trait;
use conduit_core::{AIError, Capability};
use futures::stream::BoxStream;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::SystemTime;

/// The engine-level parameters a [`crate::runtime::LocalProvider`] derives
/// from `GenerateConfig` (§4.12, step 2).
#[derive(Debug, Clone)]
pub struct EngineParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_tokens: u32,
    pub repetition_penalty: f64,
    pub prefill_step_size: u32,
    pub max_kv_size: Option<u32>,
    pub kv_quantization_bits: Option<u8>,
}

/// A loaded on-device model handle. Implemented by whatever local runtime
/// backs a given model format (MLX, GGUF, ...). The cache only tracks
/// `cost_bytes` for accounting; `encode`/`decode`/`generate_stream` are the
/// operations the local inference adapter drives.
#[async_trait]
pub trait ModelContainer: Send + Sync {
    fn cost_bytes(&self) -> u64;

    /// Tokenizer encode; a suspension point per the concurrency model.
    async fn encode(&self, text: &str) -> Vec<u32>;

    /// Tokenizer decode; a suspension point per the concurrency model.
    async fn decode(&self, ids: &[u32]) -> String;

    /// Streams generated token text for `prompt`. The stream ends on its own
    /// (finite); the adapter is responsible for honouring cancellation
    /// between items.
    fn generate_stream(&self, prompt: &str, params: EngineParams) -> BoxStream<'static, Result<String, AIError>>;
}

struct Entry {
    container: Weak<dyn ModelContainer>,
    cost_bytes: u64,
    capabilities: HashSet<Capability>,
    loaded_at: SystemTime,
}

impl Costed for Entry {
    fn cost(&self) -> u64 {
        self.cost_bytes
    }
}

/// Introspection detail for a single cached model, surfaced via
/// [`ModelCacheStats::models`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedModelInfo {
    pub model_id: String,
    pub capabilities: HashSet<Capability>,
    pub loaded_at: SystemTime,
    pub weights_size: u64,
}

/// Snapshot returned by [`ModelCache::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCacheStats {
    pub count: usize,
    pub total_cost: u64,
    pub current_model_id: Option<String>,
    pub ids: Vec<String>,
    pub models: Vec<CachedModelInfo>,
}

const DEFAULT_COUNT_LIMIT: usize = 3;

struct Inner {
    cache: LruCache<String, Entry>,
    current_model_id: Option<String>,
}

/// A cache of loaded models bounded by `count_limit` (default 3) entries
/// and/or `cost_limit` bytes (`0` = unbounded). Only a [`Weak`] reference to
/// each container is held: if every strong reference elsewhere has already
/// been dropped — the owner released it, or the process reclaimed memory
/// under pressure — `get` notices on the next lookup and reaps the stale
/// entry rather than returning a dead handle.
pub struct ModelCache {
    inner: Mutex<Inner>,
}

impl ModelCache {
    pub fn new(count_limit: usize, cost_limit: u64) -> Self {
        ModelCache {
            inner: Mutex::new(Inner {
                cache: LruCache::new(count_limit, cost_limit),
                current_model_id: None,
            }),
        }
    }

    /// Looks up `model_id`, reaping the tracking entry if its container has
    /// already been dropped elsewhere.
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn ModelContainer>> {
        let key = model_id.to_string();
        let mut inner = self.inner.lock().unwrap();
        let weak = inner.cache.get(&key).map(|entry| entry.container.clone());
        match weak.and_then(|w| w.upgrade()) {
            Some(container) => Some(container),
            None => {
                inner.cache.untrack(&key);
                None
            }
        }
    }

    /// Verifies a key both resolves to tracking state and its container is
    /// still alive, applying the same reaping rule as `get`.
    pub fn contains(&self, model_id: &str) -> bool {
        self.get(model_id).is_some()
    }

    /// Registers `container` under `model_id` with its capability set,
    /// evicting least-recently-used entries until the configured bounds
    /// hold. Eviction never blocks the caller: released containers are
    /// simply dropped here, off whatever suspension point the caller is
    /// waiting on.
    pub fn put(
        &self,
        model_id: impl Into<String>,
        container: &Arc<dyn ModelContainer>,
        capabilities: HashSet<Capability>,
    ) {
        let entry = Entry {
            container: Arc::downgrade(container),
            cost_bytes: container.cost_bytes(),
            capabilities,
            loaded_at: SystemTime::now(),
        };
        let evicted = {
            let mut inner = self.inner.lock().unwrap();
            inner.cache.put(model_id.into(), entry)
        };
        for (id, _) in evicted {
            log::debug!("evicted model '{id}' from the on-device model cache");
        }
    }

    /// Records the most-recently-selected model for introspection via
    /// `stats`. Does not itself affect eviction order.
    pub fn set_current_model(&self, model_id: Option<String>) {
        self.inner.lock().unwrap().current_model_id = model_id;
    }

    pub fn stats(&self) -> ModelCacheStats {
        let inner = self.inner.lock().unwrap();
        let CacheStats { count, total_cost } = inner.cache.stats();
        let models = inner
            .cache
            .iter()
            .map(|(id, entry)| CachedModelInfo {
                model_id: id.clone(),
                capabilities: entry.capabilities.clone(),
                loaded_at: entry.loaded_at,
                weights_size: entry.cost_bytes,
            })
            .collect();
        ModelCacheStats {
            count,
            total_cost,
            current_model_id: inner.current_model_id.clone(),
            ids: inner.cache.ids(),
            models,
        }
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        ModelCache::new(DEFAULT_COUNT_LIMIT, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubContainer(u64);

    #[async_trait]
    impl ModelContainer for StubContainer {
        fn cost_bytes(&self) -> u64 {
            self.0
        }

        async fn encode(&self, text: &str) -> Vec<u32> {
            text.split_whitespace().enumerate().map(|(i, _)| i as u32).collect()
        }

        async fn decode(&self, ids: &[u32]) -> String {
            ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" ")
        }

        fn generate_stream(&self, _prompt: &str, _params: EngineParams) -> BoxStream<'static, Result<String, AIError>> {
            Box::pin(futures::stream::empty())
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = ModelCache::new(3, 0);
        let container: Arc<dyn ModelContainer> = Arc::new(StubContainer(10));
        cache.put("a", &container, HashSet::from([Capability::Text]));
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn reaps_entries_whose_container_was_dropped_elsewhere() {
        let cache = ModelCache::new(3, 0);
        {
            let container: Arc<dyn ModelContainer> = Arc::new(StubContainer(10));
            cache.put("a", &container, HashSet::from([Capability::Text]));
        }
        assert!(cache.get("a").is_none());
        assert_eq!(cache.stats().count, 0);
    }

    #[test]
    fn evicts_past_the_default_count_limit() {
        let cache = ModelCache::default();
        let containers: Vec<Arc<dyn ModelContainer>> =
            (0..4).map(|_| Arc::new(StubContainer(1)) as Arc<dyn ModelContainer>).collect();
        for (i, container) in containers.iter().enumerate() {
            cache.put(format!("m{i}"), container, HashSet::from([Capability::Text]));
        }
        assert!(cache.stats().count <= 3);
        assert!(cache.get("m0").is_none());
        assert!(cache.get("m3").is_some());
    }

    #[test]
    fn set_current_model_is_reported_in_stats() {
        let cache = ModelCache::default();
        cache.set_current_model(Some("a".to_string()));
        assert_eq!(cache.stats().current_model_id.as_deref(), Some("a"));
    }

    #[test]
    fn stats_surfaces_capabilities_and_load_time_per_model() {
        let cache = ModelCache::new(3, 0);
        let container: Arc<dyn ModelContainer> = Arc::new(StubContainer(10));
        cache.put("a", &container, HashSet::from([Capability::Text, Capability::Streaming]));
        let models = cache.stats().models;
        let info = models.iter().find(|m| m.model_id == "a").expect("model 'a' tracked");
        assert!(info.capabilities.contains(&Capability::Text));
        assert!(info.capabilities.contains(&Capability::Streaming));
        assert_eq!(info.weights_size, 10);
        assert!(info.loaded_at <= SystemTime::now());
    }
}
