//! # conduit-huggingface
//!
//! The HuggingFace Inference API backend, scoped to the `text-generation`
//! task (see §6.2.3): request/response conversion, TGI-style SSE streaming,
//! and error mapping behind [`HuggingFaceProvider`]. Embeddings,
//! transcription and text-to-image are recognised `Capability` variants
//! elsewhere in the data model but have no endpoint-shape support here,
//! since they use request/response bodies the shared `AIProvider::generate`/
//! `stream` contract has no room to carry (binary audio input, image bytes
//! output).

#![warn(missing_docs)]

mod api_types;
/// Request/response conversion between the shared data model and the
/// `text-generation` task's wire shapes.
pub mod convert;
/// Maps a HuggingFace error body to the shared `AIError` taxonomy.
pub mod error;
/// The `AIProvider` implementation.
pub mod provider;
/// SSE decoding into `GenerationChunk`s.
pub mod stream;

pub use provider::{HuggingFaceConfig, HuggingFaceProvider};

/// Builds a provider for `model`, reading `HF_TOKEN` if `api_key` is `None`.
pub fn huggingface(model: impl Into<String>, api_key: Option<String>) -> HuggingFaceProvider {
    let api_key = api_key.or_else(|| std::env::var("HF_TOKEN").ok());
    let mut config = HuggingFaceConfig::new(model);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    HuggingFaceProvider::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{AIProvider, Availability, UnavailableReason};

    #[test]
    fn missing_env_key_reports_unavailable_not_an_error() {
        std::env::remove_var("HF_TOKEN");
        let provider = huggingface("meta-llama/Llama-3.1-8B-Instruct", None);
        assert_eq!(provider.availability(), Availability::Unavailable(UnavailableReason::MissingCredentials));
    }
}
