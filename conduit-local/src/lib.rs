//! # conduit-local
//!
//! The on-device backend for Conduit: a generic access-order LRU primitive
//! shared by three purpose-specific caches (loaded language models, diffusion
//! pipelines, text embeddings), a model download/garbage-collection manager,
//! and a local inference adapter implementing [`conduit_core::AIProvider`]
//! above whatever on-device numeric runtime a [`runtime::ModelLoader`]
//! plugs in.
//!
//! This crate makes no assumption about which inference engine backs a
//! model; it only defines the [`model_cache::ModelContainer`] contract that
//! engine must satisfy (cost accounting, tokenizer encode/decode, a token
//! stream) and drives it the way the rest of Conduit drives a cloud
//! provider's SSE stream.

#![warn(missing_docs)]

/// The eviction hook and capacity bookkeeping shared by every cache in this
/// crate.
pub mod lru_cache;

/// `ModelCache`: the LRU, count- and cost-bounded cache of loaded on-device
/// language models.
pub mod model_cache;

/// `DiffusionModelCache`: the small capacity-2 LRU over loaded diffusion
/// pipelines, releasing GPU resources on eviction.
pub mod diffusion_cache;

/// `TextEmbeddingCache`: the wait-free embedding-vector cache, cleared on
/// every model change.
pub mod embedding_cache;

/// Downloads, validates and garbage-collects on-disk model weights.
pub mod model_manager;

/// The `AIProvider` implementation driving a pluggable on-device engine.
pub mod runtime;

pub use diffusion_cache::{DiffusionModel, DiffusionModelCache};
pub use embedding_cache::TextEmbeddingCache;
pub use model_cache::{EngineParams, ModelCache, ModelContainer};
pub use model_manager::{ModelManager, ModelRepoKind};
pub use runtime::{LocalConfig, LocalProvider, ModelLoader};

/// Builds a local on-device provider over `repo_kind`'s model namespace,
/// driven by `loader` to actually load a model once its weights are on disk.
pub fn local(repo_kind: ModelRepoKind, loader: std::sync::Arc<dyn ModelLoader>) -> LocalProvider {
    LocalProvider::new(LocalConfig::new(repo_kind), loader)
}
