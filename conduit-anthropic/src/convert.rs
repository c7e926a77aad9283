//! Converts the shared `conduit_core` request/response model to and from the
//! Anthropic Messages wire shapes in [`crate::api_types`].

use crate::api_types::{
    AnthropicMessage, ContentBlock, Metadata, MessagesRequest, ToolSpec,
};
use conduit_core::{
    AIError, CompletedToolCall, FinishReason, GenerateConfig, Message, Role, StructuredContent,
    ToolChoice,
};

/// Splits `system`-role messages out (Anthropic carries system as a top-level
/// field, not a message) and converts the rest.
pub fn split_system_and_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system = Vec::new();
    let mut converted = Vec::new();

    for message in messages {
        match message.role {
            Role::System => system.push(message.content.as_text()),
            Role::Tool => converted.push(AnthropicMessage {
                role: "user".to_string(),
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                    content: message.content.as_text(),
                }],
            }),
            Role::User => converted.push(AnthropicMessage {
                role: "user".to_string(),
                content: vec![ContentBlock::Text { text: message.content.as_text() }],
            }),
            Role::Assistant => {
                let mut content = Vec::new();
                let text = message.content.as_text();
                if !text.is_empty() {
                    content.push(ContentBlock::Text { text });
                }
                for call in message.tool_calls.iter().flatten() {
                    content.push(ContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.tool_name.clone(),
                        input: call.arguments.to_json(),
                    });
                }
                converted.push(AnthropicMessage { role: "assistant".to_string(), content });
            }
        }
    }

    let system = if system.is_empty() { None } else { Some(system.join("\n\n")) };
    (system, converted)
}

fn to_tool_choice(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => serde_json::json!({ "type": "auto" }),
        ToolChoice::Any => serde_json::json!({ "type": "any" }),
        ToolChoice::None => serde_json::json!({ "type": "none" }),
        ToolChoice::Tool { name } => serde_json::json!({ "type": "tool", "name": name }),
    }
}

/// Builds the Messages API request body. Anthropic requires `max_tokens`;
/// callers that leave it unset in `GenerateConfig` get a conservative default
/// rather than an error, matching the rest of the backend's "omit, don't
/// reject" posture toward unset optional fields.
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub fn to_request(model: &str, messages: &[Message], config: &GenerateConfig, stream: bool) -> MessagesRequest {
    let (system, converted) = split_system_and_messages(messages);
    let tools = config.tools.as_ref().map(|tools| {
        tools
            .iter()
            .map(|tool| ToolSpec {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.parameters.to_json_schema(),
            })
            .collect()
    });

    MessagesRequest {
        model: model.to_string(),
        messages: converted,
        max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        temperature: config.temperature,
        top_p: config.top_p,
        top_k: config.top_k,
        stop_sequences: config.stop_sequences.clone(),
        metadata: config.user_id.clone().map(|user_id| Metadata { user_id: Some(user_id) }),
        service_tier: config.service_tier.map(|tier| match tier {
            conduit_core::ServiceTier::Auto => "auto".to_string(),
            conduit_core::ServiceTier::StandardOnly => "standard_only".to_string(),
        }),
        tools,
        tool_choice: config.tool_choice.as_ref().map(to_tool_choice),
        stream,
    }
}

/// Maps Anthropic's `stop_reason` values to the shared `FinishReason`.
pub fn stop_reason(raw: &str) -> FinishReason {
    match raw {
        "end_turn" => FinishReason::Stop,
        "max_tokens" => FinishReason::MaxTokens,
        "stop_sequence" => FinishReason::StopSequence,
        "tool_use" => FinishReason::ToolUse,
        "pause_turn" => FinishReason::PauseTurn,
        "refusal" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

/// Extracts text and completed tool calls from a non-streaming response's
/// content blocks.
pub fn split_response_content(blocks: &[ContentBlock]) -> Result<(String, Vec<CompletedToolCall>), AIError> {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: t } => text.push_str(t),
            ContentBlock::ToolUse { id, name, input } => {
                let arguments = StructuredContent::from_json(input)
                    .map_err(|e| AIError::GenerationFailed(format!("tool_use input decode failed: {e}")))?;
                tool_calls.push(CompletedToolCall { id: id.clone(), tool_name: name.clone(), arguments });
            }
            ContentBlock::ToolResult { .. } => {}
        }
    }

    Ok((text, tool_calls))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_are_pulled_out_of_the_turn_sequence() {
        let messages = vec![Message::system("be nice"), Message::user("hi")];
        let (system, converted) = split_system_and_messages(&messages);
        assert_eq!(system.as_deref(), Some("be nice"));
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].role, "user");
    }

    #[test]
    fn assistant_tool_calls_become_tool_use_blocks() {
        let call = CompletedToolCall {
            id: "call_1".to_string(),
            tool_name: "weather".to_string(),
            arguments: StructuredContent::Object(Default::default()),
        };
        let messages = vec![Message::assistant_with_tool_calls("Let me check.", vec![call])];
        let (_, converted) = split_system_and_messages(&messages);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].content.len(), 2);
        assert!(matches!(converted[0].content[0], ContentBlock::Text { .. }));
        assert!(matches!(converted[0].content[1], ContentBlock::ToolUse { .. }));
    }

    #[test]
    fn assistant_turn_with_only_tool_calls_omits_the_empty_text_block() {
        let call = CompletedToolCall {
            id: "call_1".to_string(),
            tool_name: "weather".to_string(),
            arguments: StructuredContent::Object(Default::default()),
        };
        let messages = vec![Message::assistant_with_tool_calls("", vec![call])];
        let (_, converted) = split_system_and_messages(&messages);
        assert_eq!(converted[0].content.len(), 1);
        assert!(matches!(converted[0].content[0], ContentBlock::ToolUse { .. }));
    }

    #[test]
    fn request_falls_back_to_default_max_tokens_when_unset() {
        let request = to_request("claude-3-5-sonnet", &[Message::user("hi")], &GenerateConfig::new(), false);
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn stop_reasons_map_per_the_documented_table() {
        assert_eq!(stop_reason("end_turn"), FinishReason::Stop);
        assert_eq!(stop_reason("tool_use"), FinishReason::ToolUse);
        assert_eq!(stop_reason("refusal"), FinishReason::ContentFilter);
    }

    #[test]
    fn response_content_separates_text_from_tool_use() {
        let blocks = vec![
            ContentBlock::Text { text: "Let me check.".to_string() },
            ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "weather".to_string(),
                input: serde_json::json!({"city": "Paris"}),
            },
        ];
        let (text, calls) = split_response_content(&blocks).unwrap();
        assert_eq!(text, "Let me check.");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "weather");
    }
}
