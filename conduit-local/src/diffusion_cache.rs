//! `DiffusionModelCache` (§4.10): a small LRU over `(modelId, variant)` pairs
//! that releases GPU resources synchronously on eviction.

use crate::lru_cache::{Costed, LruCache};
use std::sync::{Arc, Mutex};

/// A loaded diffusion pipeline. `release` is invoked exactly once, at
/// eviction, to free whatever GPU-side resources the pipeline holds.
pub trait DiffusionModel: Send + Sync {
    fn cost_bytes(&self) -> u64;
    fn release(&self);
}

struct Entry(Arc<dyn DiffusionModel>);

impl Costed for Entry {
    fn cost(&self) -> u64 {
        self.0.cost_bytes()
    }
}

/// The default capacity (§4.10: "Capacity default 2 (each entry 2-8 GiB)").
const DEFAULT_CAPACITY: usize = 2;

/// A cache of loaded diffusion pipelines, keyed by `(model_id, variant)`.
/// Capacity defaults to 2 entries; on eviction the evicted pipeline's
/// `release` is called before `put` returns, so the caller never observes a
/// window where an over-capacity GPU resource is still resident.
pub struct DiffusionModelCache {
    inner: Mutex<LruCache<(String, String), Entry>>,
}

impl DiffusionModelCache {
    pub fn new(capacity: usize) -> Self {
        DiffusionModelCache { inner: Mutex::new(LruCache::new(capacity, 0)) }
    }

    pub fn get(&self, model_id: &str, variant: &str) -> Option<Arc<dyn DiffusionModel>> {
        let key = (model_id.to_string(), variant.to_string());
        self.inner.lock().unwrap().get(&key).map(|entry| entry.0.clone())
    }

    pub fn put(&self, model_id: impl Into<String>, variant: impl Into<String>, model: Arc<dyn DiffusionModel>) {
        let evicted = {
            let mut inner = self.inner.lock().unwrap();
            inner.put((model_id.into(), variant.into()), Entry(model))
        };
        for (_, entry) in evicted {
            entry.0.release();
        }
    }

    pub fn clear(&self) {
        let evicted = self.inner.lock().unwrap().clear();
        for (_, entry) in evicted {
            entry.0.release();
        }
    }
}

impl Default for DiffusionModelCache {
    fn default() -> Self {
        DiffusionModelCache::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubPipeline {
        cost: u64,
        released: Arc<AtomicBool>,
    }

    impl DiffusionModel for StubPipeline {
        fn cost_bytes(&self) -> u64 {
            self.cost
        }

        fn release(&self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn evicting_the_oldest_entry_releases_it() {
        let cache = DiffusionModelCache::new(1);
        let released_a = Arc::new(AtomicBool::new(false));
        cache.put("a", "fp16", Arc::new(StubPipeline { cost: 1, released: released_a.clone() }));
        let released_b = Arc::new(AtomicBool::new(false));
        cache.put("b", "fp16", Arc::new(StubPipeline { cost: 1, released: released_b.clone() }));

        assert!(released_a.load(Ordering::SeqCst));
        assert!(!released_b.load(Ordering::SeqCst));
        assert!(cache.get("a", "fp16").is_none());
        assert!(cache.get("b", "fp16").is_some());
    }

    #[test]
    fn different_variants_of_the_same_model_are_distinct_keys() {
        let cache = DiffusionModelCache::new(2);
        cache.put("a", "fp16", Arc::new(StubPipeline { cost: 1, released: Arc::new(AtomicBool::new(false)) }));
        cache.put("a", "int8", Arc::new(StubPipeline { cost: 1, released: Arc::new(AtomicBool::new(false)) }));
        assert!(cache.get("a", "fp16").is_some());
        assert!(cache.get("a", "int8").is_some());
    }

    #[test]
    fn clear_releases_every_entry() {
        let cache = DiffusionModelCache::default();
        let released = Arc::new(AtomicBool::new(false));
        cache.put("a", "fp16", Arc::new(StubPipeline { cost: 1, released: released.clone() }));
        cache.clear();
        assert!(released.load(Ordering::SeqCst));
        assert!(cache.get("a", "fp16").is_none());
    }
}
