//! The HuggingFace Inference API backend, restricted to the
//! `text-generation` task (see the crate's top-level docs for scope).

use crate::api_types::TextGenerationResponse;
use crate::convert::{finish_reason, to_request};
use crate::error::decode_error;
use crate::stream::decode_sse_stream;
use async_trait::async_trait;
use conduit::http_executor::execute_json;
use conduit_core::{
    AIError, AIProvider, Availability, Capability, GenerateConfig, GenerationChunk,
    GenerationResult, Message, UnavailableReason,
};
use conduit_provider_utils::RetryPolicy;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Construction parameters for [`HuggingFaceProvider`]. `model` is baked into
/// the base URL since HuggingFace's Inference API is endpoint-per-model
/// (`https://api-inference.huggingface.co/models/<repo>`), unlike the
/// model-per-request shape of the other two cloud backends.
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl HuggingFaceConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), api_key: None, timeout: DEFAULT_TIMEOUT, max_retries: 2 }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint_url(&self) -> String {
        format!("https://api-inference.huggingface.co/models/{}", self.model)
    }
}

pub struct HuggingFaceProvider {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceProvider {
    pub fn new(config: HuggingFaceConfig) -> Self {
        Self { config, client: Client::new() }
    }

    fn headers(&self) -> Result<HeaderMap, AIError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| AIError::InvalidInput("api key contains invalid header characters".to_string()))?;
            headers.insert("authorization", value);
        }
        Ok(headers)
    }

    fn retry_policy(&self, config: &GenerateConfig) -> RetryPolicy {
        RetryPolicy::new(config.max_retries.unwrap_or(self.config.max_retries))
    }
}

#[async_trait]
impl AIProvider for HuggingFaceProvider {
    fn availability(&self) -> Availability {
        if self.config.api_key.is_some() {
            Availability::Available
        } else {
            Availability::Unavailable(UnavailableReason::MissingCredentials)
        }
    }

    fn capabilities(&self) -> HashSet<Capability> {
        HashSet::from([Capability::Text, Capability::Streaming])
    }

    async fn generate(
        &self,
        messages: &[Message],
        _model: &str,
        config: &GenerateConfig,
    ) -> Result<GenerationResult, AIError> {
        self.require_capability(Capability::Text)?;
        let started_at = Instant::now();
        let body = to_request(messages, config, false);
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        let (response, rate_limit_info): (Vec<TextGenerationResponse>, _) = execute_json(
            &self.client,
            Method::POST,
            &self.config.endpoint_url(),
            self.headers()?,
            &body,
            timeout,
            self.retry_policy(config),
            None::<&CancellationToken>,
            decode_error,
        )
        .await?;

        let result = response
            .into_iter()
            .next()
            .ok_or_else(|| AIError::GenerationFailed("response had no generations".to_string()))?;

        let token_count = result.details.as_ref().map(|d| d.generated_tokens).unwrap_or(0);
        let generation_time = started_at.elapsed();

        Ok(GenerationResult {
            text: result.generated_text,
            token_count,
            generation_time,
            tokens_per_second: conduit_core::tokens_per_second(token_count, generation_time),
            finish_reason: result.details.and_then(|d| d.finish_reason).as_deref().map(finish_reason),
            usage: None,
            rate_limit_info: Some(rate_limit_info),
            completed_tool_calls: None,
        })
    }

    async fn stream(
        &self,
        messages: &[Message],
        _model: &str,
        config: &GenerateConfig,
    ) -> Result<BoxStream<'static, Result<GenerationChunk, AIError>>, AIError> {
        self.require_capability(Capability::Streaming)?;
        let body = to_request(messages, config, true);
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        let response = self
            .client
            .post(self.config.endpoint_url())
            .headers(self.headers()?)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { AIError::Timeout(timeout) } else { AIError::NetworkError(e.to_string()) })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(decode_error(status, &text, None));
        }

        Ok(decode_sse_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_without_api_key_is_unavailable() {
        let provider = HuggingFaceProvider::new(HuggingFaceConfig::new("meta-llama/Llama-3.1-8B-Instruct"));
        assert_eq!(provider.availability(), Availability::Unavailable(UnavailableReason::MissingCredentials));
    }

    #[test]
    fn endpoint_url_is_model_scoped() {
        let config = HuggingFaceConfig::new("meta-llama/Llama-3.1-8B-Instruct");
        assert_eq!(
            config.endpoint_url(),
            "https://api-inference.huggingface.co/models/meta-llama/Llama-3.1-8B-Instruct"
        );
    }

    #[test]
    fn capabilities_exclude_tool_calling_and_structured_output() {
        let provider = HuggingFaceProvider::new(HuggingFaceConfig::new("m"));
        assert!(!provider.capabilities().contains(&Capability::ToolCalling));
        assert!(provider.capabilities().contains(&Capability::Text));
    }
}
