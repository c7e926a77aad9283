//! Generation outputs: the non-streaming result, the per-chunk streaming
//! event, and the shared usage/rate-limit/finish-reason types they carry.

use crate::structured_content::StructuredContent;
use serde::{Deserialize, Serialize};

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    StopSequence,
    ToolUse,
    PauseTurn,
    ContentFilter,
    Cancelled,
}

/// Token usage for a single request, as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Rate-limit metadata extracted from response headers. Every field is
/// optional because not every backend sends every header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub request_id: Option<String>,
    pub organization_id: Option<String>,
    pub limit_requests: Option<u64>,
    pub limit_tokens: Option<u64>,
    pub remaining_requests: Option<u64>,
    pub remaining_tokens: Option<u64>,
    pub reset_requests: Option<chrono::DateTime<chrono::Utc>>,
    pub reset_tokens: Option<chrono::DateTime<chrono::Utc>>,
    pub retry_after: Option<f64>,
}

/// A tool call whose arguments are still being streamed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialToolCall {
    pub id: String,
    pub tool_name: String,
    pub index: u32,
    pub arguments_fragment: String,
}

/// A fully-accumulated tool call with parsed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedToolCall {
    pub id: String,
    pub tool_name: String,
    pub arguments: StructuredContent,
}

/// The result of a non-streaming `generate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub text: String,
    pub token_count: u32,
    pub generation_time: std::time::Duration,
    pub tokens_per_second: Option<f64>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
    pub rate_limit_info: Option<RateLimitInfo>,
    /// Tool calls the model requested and that finished accumulating before
    /// this non-streaming result was returned. `None`/empty means the model
    /// produced a final answer with no further tool calls to make.
    pub completed_tool_calls: Option<Vec<CompletedToolCall>>,
}

/// A single event in a `stream` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationChunk {
    pub text: String,
    pub token_count: u32,
    pub tokens_per_second: Option<f64>,
    pub is_complete: bool,
    pub finish_reason: Option<FinishReason>,
    pub partial_tool_call: Option<PartialToolCall>,
    pub completed_tool_calls: Option<Vec<CompletedToolCall>>,
    pub usage: Option<Usage>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl GenerationChunk {
    /// A bare content chunk: not complete, no finish reason, no tool data.
    pub fn content(text: impl Into<String>, token_count: u32, tokens_per_second: Option<f64>) -> Self {
        GenerationChunk {
            text: text.into(),
            token_count,
            tokens_per_second,
            is_complete: false,
            finish_reason: None,
            partial_tool_call: None,
            completed_tool_calls: None,
            usage: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// A terminal chunk carrying a finish reason and optional usage/tool calls.
    pub fn finish(
        finish_reason: FinishReason,
        usage: Option<Usage>,
        completed_tool_calls: Option<Vec<CompletedToolCall>>,
    ) -> Self {
        GenerationChunk {
            text: String::new(),
            token_count: 0,
            tokens_per_second: None,
            is_complete: true,
            finish_reason: Some(finish_reason),
            partial_tool_call: None,
            completed_tool_calls,
            usage,
            timestamp: chrono::Utc::now(),
        }
    }

    /// The synthetic terminal chunk yielded when a stream is cancelled before
    /// any content was produced (see the SSE engine's cancellation rule).
    pub fn cancelled() -> Self {
        GenerationChunk::finish(FinishReason::Cancelled, None, None)
    }

    pub fn partial_tool_call(partial: PartialToolCall) -> Self {
        GenerationChunk {
            text: String::new(),
            token_count: 0,
            tokens_per_second: None,
            is_complete: false,
            finish_reason: None,
            partial_tool_call: Some(partial),
            completed_tool_calls: None,
            usage: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Computes `accumulatedTokens / elapsed`, returning `None` when `elapsed` is
/// not positive (the throughput metric is only meaningful past the first tick).
pub fn tokens_per_second(accumulated_tokens: u32, elapsed: std::time::Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        Some(accumulated_tokens as f64 / secs)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_is_none_at_zero_elapsed() {
        assert_eq!(tokens_per_second(5, std::time::Duration::ZERO), None);
    }

    #[test]
    fn throughput_divides_tokens_by_seconds() {
        let rate = tokens_per_second(10, std::time::Duration::from_secs(2)).unwrap();
        assert!((rate - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cancelled_chunk_is_complete_with_cancelled_reason() {
        let chunk = GenerationChunk::cancelled();
        assert!(chunk.is_complete);
        assert_eq!(chunk.finish_reason, Some(FinishReason::Cancelled));
    }
}
