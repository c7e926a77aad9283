//! Wire types for the Anthropic Messages API (request body, non-streaming
//! response, and streaming event frames).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub messages: Vec<AnthropicMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<ResponseUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One Anthropic SSE event (`event: <kind>` followed by a `data: {...}` line).
/// `kind` is carried alongside because the deserializer is driven by the
/// `event:` line, not a `type` field inside every payload shape.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub kind: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageStart {
    pub message: MessageStartInner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartInner {
    pub usage: ResponseUsage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlockStart {
    pub index: usize,
    pub content_block: ContentBlockStartInner,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockStartInner {
    Text { text: String },
    ToolUse { id: String, name: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlockDelta {
    pub index: usize,
    pub delta: DeltaInner,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeltaInner {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDelta {
    pub delta: MessageDeltaInner,
    pub usage: Option<DeltaUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaInner {
    pub stop_reason: Option<String>,
}

/// `message_delta`'s usage frame only ever carries the final `output_tokens`;
/// `input_tokens` is reported once on `message_start` instead.
#[derive(Debug, Clone, Deserialize)]
pub struct DeltaUsage {
    pub output_tokens: u32,
}
