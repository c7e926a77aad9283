use async_trait::async_trait;
use conduit::{Tool, ToolError, ToolExecutor};
use conduit_core::{
    AIError, AIProvider, Availability, Capability, CompletedToolCall, FinishReason, GenerateConfig,
    GenerationChunk, GenerationResult, Message, StructuredContent,
};
use futures::stream::BoxStream;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct DoublingTool;

#[async_trait]
impl Tool for DoublingTool {
    fn name(&self) -> &str {
        "double"
    }

    async fn execute(&self, arguments: &StructuredContent) -> Result<StructuredContent, ToolError> {
        let n = arguments.get("n").and_then(|v| v.as_i64()).map_err(|e| ToolError {
            tool: self.name().to_string(),
            underlying: e.to_string(),
        })?;
        Ok(StructuredContent::Number((n * 2) as f64))
    }
}

/// Requests one tool call on its first two turns, then answers with text.
struct ScriptedProvider {
    turn: Arc<AtomicU32>,
}

#[async_trait]
impl AIProvider for ScriptedProvider {
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
        let turn = self.turn.fetch_add(1, Ordering::SeqCst);
        let completed_tool_calls = if turn < 2 {
            Some(vec![CompletedToolCall {
                id: format!("call-{turn}"),
                tool_name: "double".to_string(),
                arguments: StructuredContent::Object(
                    [("n".to_string(), StructuredContent::Number((turn + 1) as f64))].into_iter().collect(),
                ),
            }])
        } else {
            None
        };
        Ok(GenerationResult {
            text: if turn < 2 { String::new() } else { "final answer".to_string() },
            token_count: 1,
            generation_time: std::time::Duration::from_millis(1),
            tokens_per_second: None,
            finish_reason: Some(FinishReason::Stop),
            usage: None,
            rate_limit_info: None,
            completed_tool_calls,
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
async fn runs_until_the_model_stops_requesting_tools() {
    let executor = ToolExecutor::new(vec![Arc::new(DoublingTool)]);
    let provider = ScriptedProvider { turn: Arc::new(AtomicU32::new(0)) };

    let result = executor
        .execute(&provider, vec![Message::user("double 1 then 2")], "test-model", &GenerateConfig::default())
        .await
        .unwrap();

    assert_eq!(result, "final answer");
}

#[tokio::test]
async fn exceeding_max_iterations_is_an_error_not_a_panic() {
    let executor = ToolExecutor::new(vec![Arc::new(DoublingTool)]).with_max_iterations(1);
    let provider = ScriptedProvider { turn: Arc::new(AtomicU32::new(0)) };

    let result =
        executor.execute(&provider, vec![Message::user("double forever")], "test-model", &GenerateConfig::default()).await;

    assert!(result.is_err());
}
