//! The Anthropic Messages API backend.

use crate::api_types::MessagesResponse;
use crate::convert::{split_response_content, stop_reason, to_request};
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

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl AnthropicConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: 2,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Self {
        Self { config, client: Client::new() }
    }

    fn headers(&self) -> Result<HeaderMap, AIError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| AIError::InvalidInput("api key contains invalid header characters".to_string()))?;
            headers.insert("x-api-key", value);
        }
        Ok(headers)
    }

    fn retry_policy(&self, config: &GenerateConfig) -> RetryPolicy {
        RetryPolicy::new(config.max_retries.unwrap_or(self.config.max_retries))
    }
}

#[async_trait]
impl AIProvider for AnthropicProvider {
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

        let (response, rate_limit_info): (MessagesResponse, _) = execute_json(
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

        let (text, completed_tool_calls) = split_response_content(&response.content)?;
        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });
        let token_count = usage.map(|u| u.completion_tokens).unwrap_or(0);
        let generation_time = started_at.elapsed();

        Ok(GenerationResult {
            text,
            token_count,
            generation_time,
            tokens_per_second: conduit_core::tokens_per_second(token_count, generation_time),
            finish_reason: response.stop_reason.as_deref().map(stop_reason),
            usage,
            rate_limit_info: Some(rate_limit_info),
            completed_tool_calls: if completed_tool_calls.is_empty() { None } else { Some(completed_tool_calls) },
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
