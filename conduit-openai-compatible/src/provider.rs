//! The OpenAI-compatible backend: one [`AIProvider`] implementation that
//! serves OpenAI, OpenRouter, Ollama, Azure, and any custom endpoint speaking
//! the same Chat Completions dialect, distinguished only by base URL,
//! authentication header, and default model.

use crate::api_types::ChatCompletionResponse;
use crate::convert::{finish_reason, to_completed_tool_call, to_request};
use crate::error::decode_error;
use crate::stream::decode_sse_stream;
use async_trait::async_trait;
use conduit::http_executor::execute_json;
use conduit_core::{
    AIError, AIProvider, Availability, Capability, GenerateConfig, GenerationChunk,
    GenerationResult, Message, UnavailableReason, Usage,
};
use conduit_provider_utils::RetryPolicy;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How the API key is attached to each request. OpenAI, OpenRouter, and
/// Ollama speak `Authorization: Bearer`; Azure deployments speak `api-key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    Bearer,
    ApiKeyHeader,
}

/// Construction parameters for [`OpenAiCompatibleProvider`]. `base_url` must
/// already include the `/chat/completions` path (or its Azure deployment
/// equivalent), since path shape varies too much across backends to infer.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub auth_style: AuthStyle,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl OpenAiCompatibleConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            auth_style: AuthStyle::Bearer,
            timeout: DEFAULT_TIMEOUT,
            max_retries: 2,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_auth_style(mut self, auth_style: AuthStyle) -> Self {
        self.auth_style = auth_style;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct OpenAiCompatibleProvider {
    config: OpenAiCompatibleConfig,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Self {
        Self { config, client: Client::new() }
    }

    fn headers(&self) -> Result<HeaderMap, AIError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let (name, value) = match self.config.auth_style {
                AuthStyle::Bearer => ("authorization".to_string(), format!("Bearer {key}")),
                AuthStyle::ApiKeyHeader => ("api-key".to_string(), key.clone()),
            };
            let value = HeaderValue::from_str(&value)
                .map_err(|_| AIError::InvalidInput("api key contains invalid header characters".to_string()))?;
            headers.insert(reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(), value);
        }
        Ok(headers)
    }

    fn retry_policy(&self, config: &GenerateConfig) -> RetryPolicy {
        RetryPolicy::new(config.max_retries.unwrap_or(self.config.max_retries))
    }
}

#[async_trait]
impl AIProvider for OpenAiCompatibleProvider {
    fn availability(&self) -> Availability {
        if self.config.api_key.is_some() {
            Availability::Available
        } else {
            Availability::Unavailable(UnavailableReason::MissingCredentials)
        }
    }

    fn capabilities(&self) -> HashSet<Capability> {
        HashSet::from([
            Capability::Text,
            Capability::Streaming,
            Capability::StructuredOutput,
            Capability::ToolCalling,
            Capability::Vision,
        ])
    }

    async fn generate(
        &self,
        messages: &[Message],
        model: &str,
        config: &GenerateConfig,
    ) -> Result<GenerationResult, AIError> {
        self.require_capability(Capability::Text)?;
        let started_at = Instant::now();
        let body = to_request(model, messages, config, false);
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        let (response, rate_limit_info): (ChatCompletionResponse, _) = execute_json(
            &self.client,
            Method::POST,
            &self.config.base_url,
            self.headers()?,
            &body,
            timeout,
            self.retry_policy(config),
            None::<&CancellationToken>,
            decode_error,
        )
        .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AIError::GenerationFailed("response had no choices".to_string()))?;

        let completed_tool_calls = match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() => {
                Some(calls.iter().map(to_completed_tool_call).collect::<Result<Vec<_>, _>>()?)
            }
            _ => None,
        };

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        let token_count = usage.map(|u| u.completion_tokens).unwrap_or(0);
        let generation_time = started_at.elapsed();

        Ok(GenerationResult {
            text: choice.message.content.unwrap_or_default(),
            token_count,
            generation_time,
            tokens_per_second: conduit_core::tokens_per_second(token_count, generation_time),
            finish_reason: choice.finish_reason.as_deref().map(finish_reason),
            usage,
            rate_limit_info: Some(rate_limit_info),
            completed_tool_calls,
        })
    }

    async fn stream(
        &self,
        messages: &[Message],
        model: &str,
        config: &GenerateConfig,
    ) -> Result<BoxStream<'static, Result<GenerationChunk, AIError>>, AIError> {
        self.require_capability(Capability::Streaming)?;
        let body = to_request(model, messages, config, true);
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        let response = self
            .client
            .post(&self.config.base_url)
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
        let provider = OpenAiCompatibleProvider::new(OpenAiCompatibleConfig::new("https://example.test/v1/chat/completions"));
        assert_eq!(provider.availability(), Availability::Unavailable(UnavailableReason::MissingCredentials));
    }

    #[test]
    fn azure_auth_style_sends_api_key_header_not_bearer() {
        let provider = OpenAiCompatibleProvider::new(
            OpenAiCompatibleConfig::new("https://my-deployment.openai.azure.com")
                .with_api_key("secret")
                .with_auth_style(AuthStyle::ApiKeyHeader),
        );
        let headers = provider.headers().unwrap();
        assert_eq!(headers.get("api-key").unwrap(), "secret");
        assert!(headers.get("authorization").is_none());
    }

    #[test]
    fn bearer_auth_style_is_the_default() {
        let provider = OpenAiCompatibleProvider::new(
            OpenAiCompatibleConfig::new("https://api.openai.com/v1/chat/completions").with_api_key("secret"),
        );
        let headers = provider.headers().unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer secret");
    }
}
