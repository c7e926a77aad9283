//! `TextEmbeddingCache` (§4.11): a wait-free, non-suspending LRU over
//! `(prompt, negativePrompt, modelId)` keyed embeddings, cleared wholesale on
//! every model change.

use crate::lru_cache::{Costed, LruCache};
use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 50;
const DEFAULT_COST_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

/// A cached embedding vector. Cost is `shape.product() * size_of::<f32>()`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEmbeddingEntry {
    pub embedding: Vec<f32>,
}

impl Costed for TextEmbeddingEntry {
    fn cost(&self) -> u64 {
        (self.embedding.len() * std::mem::size_of::<f32>()) as u64
    }
}

/// Key identifying one embedding result: the exact prompt pair and the
/// model that produced it. An embedding is meaningless under a different
/// model, hence `model_did_change` clearing the whole cache rather than
/// evicting by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EmbeddingKey {
    prompt: String,
    negative_prompt: Option<String>,
    model_id: String,
}

/// Capacity defaults to 50 entries or 100 MiB, whichever binds first. All
/// operations are synchronous and wait-free (a plain `Mutex`, never an
/// async lock) per the concurrency model's non-suspending requirement for
/// this cache.
pub struct TextEmbeddingCache {
    inner: Mutex<LruCache<EmbeddingKey, TextEmbeddingEntry>>,
}

impl TextEmbeddingCache {
    pub fn new(count_limit: usize, cost_limit_bytes: u64) -> Self {
        TextEmbeddingCache { inner: Mutex::new(LruCache::new(count_limit, cost_limit_bytes)) }
    }

    pub fn get(&self, prompt: &str, negative_prompt: Option<&str>, model_id: &str) -> Option<Vec<f32>> {
        let key = Self::key(prompt, negative_prompt, model_id);
        self.inner.lock().unwrap().get(&key).map(|entry| entry.embedding.clone())
    }

    pub fn put(&self, prompt: &str, negative_prompt: Option<&str>, model_id: &str, embedding: Vec<f32>) {
        let key = Self::key(prompt, negative_prompt, model_id);
        self.inner.lock().unwrap().put(key, TextEmbeddingEntry { embedding });
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    /// Clears the entire cache before the caller installs `new_model_id` as
    /// current — an embedding computed under the previous model is never
    /// valid under a different one.
    pub fn model_did_change(&self, _new_model_id: &str) {
        self.clear();
    }

    fn key(prompt: &str, negative_prompt: Option<&str>, model_id: &str) -> EmbeddingKey {
        EmbeddingKey {
            prompt: prompt.to_string(),
            negative_prompt: negative_prompt.map(str::to_string),
            model_id: model_id.to_string(),
        }
    }
}

impl Default for TextEmbeddingCache {
    fn default() -> Self {
        TextEmbeddingCache::new(DEFAULT_CAPACITY, DEFAULT_COST_LIMIT_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips_by_full_key() {
        let cache = TextEmbeddingCache::default();
        cache.put("hello", None, "model-a", vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.get("hello", None, "model-a"), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn negative_prompt_participates_in_the_key() {
        let cache = TextEmbeddingCache::default();
        cache.put("hello", Some("blurry"), "model-a", vec![1.0]);
        assert_eq!(cache.get("hello", None, "model-a"), None);
        assert_eq!(cache.get("hello", Some("blurry"), "model-a"), Some(vec![1.0]));
    }

    #[test]
    fn model_change_clears_every_entry() {
        let cache = TextEmbeddingCache::default();
        cache.put("hello", None, "model-a", vec![1.0]);
        cache.model_did_change("model-b");
        assert_eq!(cache.get("hello", None, "model-a"), None);
    }

    #[test]
    fn cost_limit_evicts_oversized_entries() {
        let cache = TextEmbeddingCache::new(50, 16);
        cache.put("a", None, "m", vec![0.0; 2]);
        cache.put("b", None, "m", vec![0.0; 2]);
        assert_eq!(cache.get("a", None, "m"), None);
        assert!(cache.get("b", None, "m").is_some());
    }
}
