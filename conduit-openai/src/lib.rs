//! # conduit-openai
//!
//! A thin preset over [`conduit_openai_compatible`] wired to OpenAI's own
//! endpoint and `OPENAI_API_KEY`. Equivalent to constructing
//! [`OpenAiCompatibleProvider`](conduit_openai_compatible::OpenAiCompatibleProvider)
//! by hand with [`presets::OPENAI_BASE_URL`](conduit_openai_compatible::presets::OPENAI_BASE_URL).

#![warn(missing_docs)]

use conduit_openai_compatible::{
    presets::OPENAI_BASE_URL, AuthStyle, OpenAiCompatibleConfig, OpenAiCompatibleProvider,
};

/// Builds a provider for OpenAI's own Chat Completions endpoint.
///
/// Reads `OPENAI_API_KEY` if `api_key` is `None`. No error is raised for a
/// missing key here; `AIProvider::availability()` reports it instead, per the
/// contract that availability checks never themselves fail.
pub fn openai(api_key: Option<String>) -> OpenAiCompatibleProvider {
    let api_key = api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let mut config = OpenAiCompatibleConfig::new(OPENAI_BASE_URL).with_auth_style(AuthStyle::Bearer);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    OpenAiCompatibleProvider::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{AIProvider, Availability, UnavailableReason};

    #[test]
    fn missing_env_key_reports_unavailable_not_an_error() {
        std::env::remove_var("OPENAI_API_KEY");
        let provider = openai(None);
        assert_eq!(provider.availability(), Availability::Unavailable(UnavailableReason::MissingCredentials));
    }

    #[test]
    fn explicit_key_overrides_environment() {
        let provider = openai(Some("sk-test".to_string()));
        assert_eq!(provider.availability(), Availability::Available);
    }
}
