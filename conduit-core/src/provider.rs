//! The `AIProvider` contract every backend implements, and the capability
//! model requests are checked against before a network call is made.

use crate::error::AIError;
use crate::generate_config::GenerateConfig;
use crate::generation::{GenerationChunk, GenerationResult};
use crate::message::Message;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashSet;

/// A capability a provider may or may not support. The capability set is a
/// pure function of the provider's backend kind and credentials — it never
/// depends on the request being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Text,
    Streaming,
    StructuredOutput,
    ToolCalling,
    Vision,
    Embeddings,
    Transcription,
    ImageGen,
    TokenCount,
}

/// Why a provider is currently unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    MissingCredentials,
    UnsupportedPlatform(String),
    CapabilityNotSupported(Capability),
}

/// Whether a provider can currently serve requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(UnavailableReason),
}

/// The contract every Conduit backend implements: Anthropic, OpenAI-compatible
/// (OpenAI/OpenRouter/Ollama/Azure/custom), HuggingFace, and the local
/// on-device adapter all sit behind this single polymorphic surface.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// A deterministic function of environment (arch, OS, presence of
    /// credentials) — never performs network I/O.
    fn availability(&self) -> Availability;

    /// The capability set this provider instance supports.
    fn capabilities(&self) -> HashSet<Capability>;

    /// An at-most-once request with retry (see the HTTP executor in `conduit`).
    async fn generate(
        &self,
        messages: &[Message],
        model: &str,
        config: &GenerateConfig,
    ) -> Result<GenerationResult, AIError>;

    /// A finite, cancellation-aware stream of chunks.
    async fn stream(
        &self,
        messages: &[Message],
        model: &str,
        config: &GenerateConfig,
    ) -> Result<BoxStream<'static, Result<GenerationChunk, AIError>>, AIError>;

    /// Checks a requested capability without contacting the network,
    /// returning the precise `ProviderUnavailable`/`InvalidInput` error the
    /// contract requires when a request would exercise it.
    fn require_capability(&self, capability: Capability) -> Result<(), AIError> {
        if self.capabilities().contains(&capability) {
            Ok(())
        } else {
            Err(AIError::UnsupportedPlatform(format!("capability not supported: {capability:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        caps: HashSet<Capability>,
    }

    #[async_trait]
    impl AIProvider for StubProvider {
        fn availability(&self) -> Availability {
            Availability::Available
        }

        fn capabilities(&self) -> HashSet<Capability> {
            self.caps.clone()
        }

        async fn generate(
            &self,
            _messages: &[Message],
            _model: &str,
            _config: &GenerateConfig,
        ) -> Result<GenerationResult, AIError> {
            unimplemented!()
        }

        async fn stream(
            &self,
            _messages: &[Message],
            _model: &str,
            _config: &GenerateConfig,
        ) -> Result<BoxStream<'static, Result<GenerationChunk, AIError>>, AIError> {
            unimplemented!()
        }
    }

    #[test]
    fn require_capability_fails_without_network_when_unsupported() {
        let provider = StubProvider { caps: HashSet::from([Capability::Text]) };
        let result = provider.require_capability(Capability::Vision);
        assert!(matches!(result, Err(AIError::UnsupportedPlatform(_))));
    }

    #[test]
    fn require_capability_succeeds_when_present() {
        let provider = StubProvider { caps: HashSet::from([Capability::Text]) };
        assert!(provider.require_capability(Capability::Text).is_ok());
    }
}
