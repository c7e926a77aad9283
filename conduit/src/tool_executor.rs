//! The multi-step tool execution loop: alternates `generate` calls with
//! concurrent tool invocation until the model stops requesting tools or
//! `max_iterations` is exceeded.
//!
//! Grounded in the teacher's per-call tool dispatch
//! (`generate_text/execute_tool_call.rs` looks a tool up by name, builds its
//! options, awaits its execution, maps the outcome to a result/error) and in
//! the concurrency model's mandate that tool calls within one assistant turn
//! run concurrently via `futures::future::join_all`.

use async_trait::async_trait;
use conduit_core::{
    AIError, AIProvider, CompletedToolCall, GenerateConfig, Message, StructuredContent,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// A callable tool the executor can dispatch a model's tool call to.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, arguments: &StructuredContent) -> Result<StructuredContent, ToolError>;
}

/// A tool invocation failure. Per §4.8, this is surfaced back to the model
/// as the tool's output rather than aborting the whole loop.
#[derive(Debug, Clone, thiserror::Error)]
#[error("tool \"{tool}\" failed: {underlying}")]
pub struct ToolError {
    pub tool: String,
    pub underlying: String,
}

/// Runs up to `max_iterations` generate-calls, dispatching any tool calls the
/// model requests to the matching registered [`Tool`] and feeding their
/// outputs back in as `tool`-role messages, until the model responds without
/// requesting any more tools.
pub struct ToolExecutor {
    tools: HashMap<String, Arc<dyn Tool>>,
    max_iterations: u32,
}

impl ToolExecutor {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name().to_string(), t)).collect(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Runs the loop against `provider`, starting from `messages`, returning
    /// the final assistant text once the model stops requesting tools.
    pub async fn execute(
        &self,
        provider: &dyn AIProvider,
        mut messages: Vec<Message>,
        model: &str,
        config: &GenerateConfig,
    ) -> Result<String, AIError> {
        for _ in 0..self.max_iterations {
            let result = provider.generate(&messages, model, config).await?;

            let tool_calls = match result.completed_tool_calls {
                Some(calls) if !calls.is_empty() => calls,
                _ => return Ok(result.text),
            };

            messages.push(Message::assistant_with_tool_calls(result.text.clone(), tool_calls.clone()));

            let invocations = tool_calls.iter().map(|call| self.invoke(call));
            let outputs = join_all(invocations).await;

            for (call, output) in tool_calls.iter().zip(outputs) {
                let content = match output {
                    Ok(value) => value,
                    Err(err) => {
                        let mut obj = indexmap::IndexMap::new();
                        obj.insert("error".to_string(), StructuredContent::String(err.to_string()));
                        StructuredContent::Object(obj)
                    }
                };
                messages.push(Message::tool(call.id.clone(), call.tool_name.clone(), content.render()));
            }
        }

        Err(AIError::GenerationFailed(format!(
            "exceeded maximum tool iterations ({})",
            self.max_iterations
        )))
    }

    async fn invoke(&self, call: &CompletedToolCall) -> Result<StructuredContent, ToolError> {
        let tool = self.tools.get(&call.tool_name).ok_or_else(|| ToolError {
            tool: call.tool_name.clone(),
            underlying: "no such tool registered".to_string(),
        })?;
        tool.execute(&call.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conduit_core::{Availability, Capability, GenerationChunk, GenerationResult};
    use futures::stream::BoxStream;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoTool {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(&self, arguments: &StructuredContent) -> Result<StructuredContent, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(arguments.clone())
        }
    }

    struct OneShotProvider;

    #[async_trait]
    impl AIProvider for OneShotProvider {
        fn availability(&self) -> Availability {
            Availability::Available
        }

        fn capabilities(&self) -> HashSet<Capability> {
            HashSet::from([Capability::Text, Capability::ToolCalling])
        }

        async fn generate(
            &self,
            _messages: &[Message],
            _model: &str,
            _config: &GenerateConfig,
        ) -> Result<GenerationResult, AIError> {
            Ok(GenerationResult {
                text: "done".to_string(),
                token_count: 1,
                generation_time: std::time::Duration::from_millis(1),
                tokens_per_second: None,
                finish_reason: Some(conduit_core::FinishReason::Stop),
                usage: None,
                rate_limit_info: None,
                completed_tool_calls: None,
            })
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

    #[tokio::test]
    async fn stops_immediately_when_no_tool_calls_are_made() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = ToolExecutor::new(vec![Arc::new(EchoTool { calls: calls.clone() })]);
        let result = executor
            .execute(&OneShotProvider, vec![Message::user("hi")], "test-model", &GenerateConfig::default())
            .await
            .unwrap();
        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
