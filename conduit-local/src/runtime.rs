//! The local inference adapter (§4.12): exposes `generate`/`stream` above an
//! on-device numeric runtime by resolving a loaded model via `ModelCache`
//! (downloading through `ModelManager` on miss), converting `GenerateConfig`
//! into engine parameters, building a prompt from the conversation, and
//! iterating the engine's token stream with running throughput and
//! cancellation checks.

use crate::model_cache::{EngineParams, ModelCache, ModelContainer};
use crate::model_manager::{ModelManager, ModelRepoKind};
use async_trait::async_trait;
use conduit_core::{
    AIError, AIProvider, Availability, Capability, FinishReason, GenerateConfig, GenerationChunk, GenerationResult,
    Message, Role,
};
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-message special-token overhead the engine's tokenizer doesn't itself
/// account for (§4.12: "an approximate per-message special-token overhead of
/// 4 tokens").
const PER_MESSAGE_TOKEN_OVERHEAD: u32 = 4;

/// Loads a model container given its id and resolved local path. Implemented
/// per on-device runtime (MLX, GGUF, ...); kept behind a trait so this
/// adapter doesn't depend on a specific inference engine.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_id: &str, local_path: &std::path::Path) -> Result<Arc<dyn ModelContainer>, AIError>;
}

/// Configuration for the local on-device backend.
#[derive(Clone)]
pub struct LocalConfig {
    pub repo_kind: ModelRepoKind,
    /// Builds the download URL for a given model id, when it isn't already
    /// cached on disk. `None` means this backend only ever serves models
    /// already present locally; a cache miss then fails with
    /// `ModelNotCached` rather than attempting a network fetch.
    pub source_url_template: Option<Arc<dyn Fn(&str) -> String + Send + Sync>>,
    pub model_count_limit: usize,
    pub model_cost_limit_bytes: u64,
    pub last_n_turns: usize,
    pub gpu_memory_limit_bytes: Option<u64>,
}

impl LocalConfig {
    pub fn new(repo_kind: ModelRepoKind) -> Self {
        LocalConfig {
            repo_kind,
            source_url_template: None,
            model_count_limit: 3,
            model_cost_limit_bytes: 0,
            last_n_turns: 20,
            gpu_memory_limit_bytes: None,
        }
    }

    pub fn with_source_url_template(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.source_url_template = Some(Arc::new(f));
        self
    }

    pub fn with_gpu_memory_limit_bytes(mut self, limit: u64) -> Self {
        self.gpu_memory_limit_bytes = Some(limit);
        self
    }

    pub fn with_last_n_turns(mut self, n: usize) -> Self {
        self.last_n_turns = n;
        self
    }

    fn source_url_for(&self, model_id: &str) -> Result<String, AIError> {
        match &self.source_url_template {
            Some(template) => Ok(template(model_id)),
            None => Err(AIError::ModelNotCached(model_id.to_string())),
        }
    }
}

static GPU_MEMORY_LIMIT_APPLIED: OnceLock<()> = OnceLock::new();

/// `AIProvider` implementation backed by on-device inference. Models are
/// loaded lazily through `ModelCache`/`ModelManager` and held for reuse
/// across calls; only one model-loading attempt runs at a time per model id
/// since the cache itself serialises mutation under a single lock.
pub struct LocalProvider {
    config: LocalConfig,
    model_cache: ModelCache,
    model_manager: ModelManager,
    loader: Arc<dyn ModelLoader>,
    cancel: CancellationToken,
}

impl LocalProvider {
    pub fn new(config: LocalConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let model_cache = ModelCache::new(config.model_count_limit, config.model_cost_limit_bytes);
        LocalProvider {
            model_manager: ModelManager::new(),
            config,
            model_cache,
            loader,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_model_manager(mut self, model_manager: ModelManager) -> Self {
        self.model_manager = model_manager;
        self
    }

    /// Cancels every in-flight `stream`/`generate` call on this provider
    /// instance. Each yields its terminal `cancelled` chunk on its next loop
    /// turn rather than stopping mid-token silently.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }

    pub fn model_cache(&self) -> &ModelCache {
        &self.model_cache
    }

    /// Triggers a minimal deterministic generation (temperature 0) to force
    /// model load, kernel compilation and KV allocation ahead of a
    /// latency-critical call.
    pub async fn warm_up(&self, model_id: &str, prefill_chars: usize, max_tokens: u32) -> Result<(), AIError> {
        let container = self.ensure_loaded(model_id).await?;
        let prompt: String = std::iter::repeat('x').take(prefill_chars).collect();
        let params = EngineParams {
            temperature: 0.0,
            top_p: 1.0,
            top_k: 1,
            max_tokens,
            repetition_penalty: 1.0,
            prefill_step_size: DEFAULT_PREFILL_STEP_SIZE,
            max_kv_size: None,
            kv_quantization_bits: None,
        };
        let mut tokens = container.generate_stream(&prompt, params);
        while tokens.next().await.transpose()?.is_some() {}
        Ok(())
    }

    async fn ensure_loaded(&self, model_id: &str) -> Result<Arc<dyn ModelContainer>, AIError> {
        if let Some(container) = self.model_cache.get(model_id) {
            self.model_cache.set_current_model(Some(model_id.to_string()));
            return Ok(container);
        }

        self.model_manager.migrate_legacy_cache().await?;
        if !self.model_manager.is_cached(self.config.repo_kind, model_id) {
            let source_url = self.config.source_url_for(model_id)?;
            self.model_manager.download(self.config.repo_kind, model_id, &source_url).await?;
        }
        let local_path = self.model_manager.local_path(self.config.repo_kind, model_id);
        let container = self.loader.load(model_id, &local_path).await?;
        self.model_cache.put(model_id, &container, self.capabilities());
        self.model_cache.set_current_model(Some(model_id.to_string()));
        Ok(container)
    }

    fn apply_runtime_settings_once(&self) {
        if let Some(limit) = self.config.gpu_memory_limit_bytes {
            GPU_MEMORY_LIMIT_APPLIED.get_or_init(|| {
                log::info!("applying process-wide GPU memory limit of {limit} bytes");
            });
        }
    }

    fn engine_params(&self, config: &GenerateConfig) -> EngineParams {
        EngineParams {
            temperature: config.temperature.unwrap_or(0.7),
            top_p: config.top_p.unwrap_or(1.0),
            top_k: config.top_k.unwrap_or(40),
            max_tokens: config.max_tokens.unwrap_or(512),
            repetition_penalty: config.repetition_penalty.unwrap_or(1.0),
            prefill_step_size: DEFAULT_PREFILL_STEP_SIZE,
            max_kv_size: None,
            kv_quantization_bits: None,
        }
    }
}

const DEFAULT_PREFILL_STEP_SIZE: u32 = 512;

/// Builds the prompt text from a conversation: a system prefix (if any),
/// then up to `last_n_turns` of the remaining turns with role markers
/// preserved, ending in an open `Assistant:` line. A single user-only
/// message bypasses role formatting entirely.
fn build_prompt(messages: &[Message], last_n_turns: usize) -> String {
    if messages.len() == 1 && messages[0].role == Role::User {
        return messages[0].content.as_text();
    }

    let system_prefix = messages.iter().find(|m| m.role == Role::System).map(|m| m.content.as_text());
    let turns: Vec<&Message> = messages.iter().filter(|m| m.role != Role::System).collect();
    let start = turns.len().saturating_sub(last_n_turns);

    let mut prompt = String::new();
    if let Some(prefix) = system_prefix {
        prompt.push_str(&prefix);
        prompt.push_str("\n\n");
    }
    for message in &turns[start..] {
        let marker = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::Tool => "Tool",
            Role::System => unreachable!("system turns filtered out above"),
        };
        prompt.push_str(marker);
        prompt.push_str(": ");
        prompt.push_str(&message.content.as_text());
        prompt.push('\n');
    }
    prompt.push_str("Assistant: ");
    prompt
}

async fn estimate_prompt_tokens(container: &Arc<dyn ModelContainer>, messages: &[Message]) -> u32 {
    let mut total = 0u32;
    for message in messages {
        total += container.encode(&message.content.as_text()).await.len() as u32;
        total += PER_MESSAGE_TOKEN_OVERHEAD;
    }
    total
}

#[async_trait]
impl AIProvider for LocalProvider {
    fn availability(&self) -> Availability {
        Availability::Available
    }

    fn capabilities(&self) -> HashSet<Capability> {
        HashSet::from([Capability::Text, Capability::Streaming, Capability::TokenCount])
    }

    async fn generate(
        &self,
        messages: &[Message],
        model: &str,
        config: &GenerateConfig,
    ) -> Result<GenerationResult, AIError> {
        self.require_capability(Capability::Text)?;
        self.apply_runtime_settings_once();
        let container = self.ensure_loaded(model).await?;
        let prompt_tokens = estimate_prompt_tokens(&container, messages).await;
        let prompt = build_prompt(messages, self.config.last_n_turns);
        let params = self.engine_params(config);

        let started_at = Instant::now();
        let mut text = String::new();
        let mut completion_tokens = 0u32;
        let mut stream = container.generate_stream(&prompt, params);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(AIError::Cancelled);
                }
                next = stream.next() => {
                    match next {
                        Some(token) => {
                            text.push_str(&token?);
                            completion_tokens += 1;
                        }
                        None => break,
                    }
                }
            }
        }

        let elapsed = started_at.elapsed();
        Ok(GenerationResult {
            text,
            token_count: completion_tokens,
            generation_time: elapsed,
            tokens_per_second: conduit_core::tokens_per_second(completion_tokens, elapsed),
            finish_reason: Some(FinishReason::Stop),
            usage: Some(conduit_core::Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            rate_limit_info: None,
            completed_tool_calls: None,
        })
    }

    async fn stream(
        &self,
        messages: &[Message],
        model: &str,
        config: &GenerateConfig,
    ) -> Result<BoxStream<'static, Result<GenerationChunk, AIError>>, AIError> {
        self.require_capability(Capability::Streaming)?;
        self.apply_runtime_settings_once();
        let container = self.ensure_loaded(model).await?;
        let prompt = build_prompt(messages, self.config.last_n_turns);
        let params = self.engine_params(config);
        let cancel = self.cancel.clone();

        let stream = async_stream::try_stream! {
            let started_at = Instant::now();
            let mut accumulated_tokens: u32 = 0;
            let mut engine_tokens = container.generate_stream(&prompt, params);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        yield GenerationChunk::cancelled();
                        return;
                    }
                    next = engine_tokens.next() => {
                        match next {
                            Some(token) => {
                                let text = token?;
                                accumulated_tokens += 1;
                                let elapsed = started_at.elapsed();
                                let tps = conduit_core::tokens_per_second(accumulated_tokens, elapsed);
                                yield GenerationChunk::content(text, accumulated_tokens, tps);
                            }
                            None => {
                                yield GenerationChunk::finish(FinishReason::Stop, None, None);
                                return;
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_cache::EngineParams as TestEngineParams;

    fn msg(role: Role, text: &str) -> Message {
        match role {
            Role::System => Message::system(text),
            Role::User => Message::user(text),
            Role::Assistant => Message::assistant(text),
            Role::Tool => Message::tool("id", "tool", text),
        }
    }

    #[test]
    fn single_user_message_bypasses_role_formatting() {
        let messages = vec![msg(Role::User, "hello")];
        assert_eq!(build_prompt(&messages, 20), "hello");
    }

    #[test]
    fn multi_turn_prompt_carries_role_markers_and_system_prefix() {
        let messages =
            vec![msg(Role::System, "be terse"), msg(Role::User, "hi"), msg(Role::Assistant, "hello")];
        let prompt = build_prompt(&messages, 20);
        assert!(prompt.starts_with("be terse\n\n"));
        assert!(prompt.contains("User: hi\n"));
        assert!(prompt.contains("Assistant: hello\n"));
        assert!(prompt.ends_with("Assistant: "));
    }

    #[test]
    fn last_n_turns_truncates_older_history() {
        let messages = vec![
            msg(Role::User, "turn1"),
            msg(Role::Assistant, "reply1"),
            msg(Role::User, "turn2"),
        ];
        let prompt = build_prompt(&messages, 1);
        assert!(!prompt.contains("turn1"));
        assert!(prompt.contains("turn2"));
    }

    struct NoopLoader;
    #[async_trait]
    impl ModelLoader for NoopLoader {
        async fn load(&self, _model_id: &str, _local_path: &std::path::Path) -> Result<Arc<dyn ModelContainer>, AIError> {
            Err(AIError::GenerationFailed("no loader configured in test".to_string()))
        }
    }

    #[test]
    fn missing_source_template_reports_model_not_cached() {
        let config = LocalConfig::new(ModelRepoKind::Mlx);
        let result = config.source_url_for("org/model");
        assert!(matches!(result, Err(AIError::ModelNotCached(_))));
    }

    #[tokio::test]
    async fn capabilities_exclude_tool_calling_and_vision() {
        let provider = LocalProvider::new(LocalConfig::new(ModelRepoKind::Mlx), Arc::new(NoopLoader));
        let caps = provider.capabilities();
        assert!(caps.contains(&Capability::Text));
        assert!(!caps.contains(&Capability::ToolCalling));
        assert!(!caps.contains(&Capability::Vision));
    }

    #[test]
    fn engine_params_fall_back_to_documented_defaults() {
        let provider = LocalProvider::new(LocalConfig::new(ModelRepoKind::Mlx), Arc::new(NoopLoader));
        let params: TestEngineParams = provider.engine_params(&GenerateConfig::new());
        assert_eq!(params.temperature, 0.7);
        assert_eq!(params.max_tokens, 512);
    }
}
