//! # conduit-anthropic
//!
//! The Anthropic Messages API backend: request/response conversion, SSE
//! event decoding (`message_start`, `content_block_*`, `message_delta`,
//! `message_stop`), and error mapping behind one [`AIProvider`](conduit_core::AIProvider)
//! implementation, [`AnthropicProvider`].

#![warn(missing_docs)]

mod api_types;
/// Request/response conversion between the shared data model and the
/// Messages API wire shapes.
pub mod convert;
/// Maps an Anthropic error body to the shared `AIError` taxonomy.
pub mod error;
/// The `AIProvider` implementation.
pub mod provider;
/// SSE decoding into `GenerationChunk`s.
pub mod stream;

pub use provider::{AnthropicConfig, AnthropicProvider};

/// Builds a provider reading `ANTHROPIC_API_KEY` if `api_key` is `None`.
pub fn anthropic(api_key: Option<String>) -> AnthropicProvider {
    let api_key = api_key.or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
    let mut config = AnthropicConfig::new();
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    AnthropicProvider::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{AIProvider, Availability, UnavailableReason};

    #[test]
    fn missing_env_key_reports_unavailable_not_an_error() {
        std::env::remove_var("ANTHROPIC_API_KEY");
        let provider = anthropic(None);
        assert_eq!(provider.availability(), Availability::Unavailable(UnavailableReason::MissingCredentials));
    }
}
