//! Converts the shared `conduit_core` request/response model to and from the
//! OpenAI-compatible wire shapes in [`crate::api_types`].

use crate::api_types::{
    ChatCompletionRequest, ChatMessage, FunctionCallRequest, FunctionSpec, ResponseToolCall,
    ToolCallRequest, ToolSpec,
};
use conduit_core::{
    AIError, CompletedToolCall, Content, GenerateConfig, Message, Role, StructuredContent,
    ToolChoice,
};

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

pub fn to_chat_message(message: &Message) -> ChatMessage {
    ChatMessage {
        role: role_str(message.role).to_string(),
        content: Some(message.content.as_text()),
        tool_call_id: message.tool_call_id.clone(),
        tool_calls: message
            .tool_calls
            .as_ref()
            .map(|calls| calls.iter().map(to_tool_call_request).collect()),
    }
}

fn to_tool_choice(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => serde_json::json!("auto"),
        ToolChoice::Any => serde_json::json!("required"),
        ToolChoice::None => serde_json::json!("none"),
        ToolChoice::Tool { name } => {
            serde_json::json!({ "type": "function", "function": { "name": name } })
        }
    }
}

/// Builds the request body for `model` from `messages` and `config`.
/// `stream` selects between the non-streaming and SSE endpoints.
pub fn to_request(
    model: &str,
    messages: &[Message],
    config: &GenerateConfig,
    stream: bool,
) -> ChatCompletionRequest {
    let tools = config.tools.as_ref().map(|tools| {
        tools
            .iter()
            .map(|tool| ToolSpec {
                kind: "function".to_string(),
                function: FunctionSpec {
                    name: tool.name.clone(),
                    description: Some(tool.description.clone()),
                    parameters: tool.parameters.to_json_schema(),
                },
            })
            .collect()
    });

    ChatCompletionRequest {
        model: model.to_string(),
        messages: messages.iter().map(to_chat_message).collect(),
        temperature: config.temperature.map(|t| t as f32),
        top_p: config.top_p.map(|t| t as f32),
        max_tokens: config.max_tokens,
        stop: config.stop_sequences.clone(),
        tools,
        tool_choice: config.tool_choice.as_ref().map(to_tool_choice),
        response_format: None,
        service_tier: config.service_tier.map(|tier| match tier {
            conduit_core::ServiceTier::Auto => "auto".to_string(),
            conduit_core::ServiceTier::StandardOnly => "default".to_string(),
        }),
        stream,
    }
}

/// Converts a response tool call into the shared `CompletedToolCall`,
/// repairing truncated argument JSON the same way the streaming path does.
pub fn to_completed_tool_call(call: &ResponseToolCall) -> Result<CompletedToolCall, AIError> {
    let repaired = conduit_provider_utils::repair_json(&call.function.arguments)
        .map_err(|e| AIError::GenerationFailed(format!("tool call arguments failed to repair: {e}")))?;
    let arguments = StructuredContent::parse(&repaired)
        .map_err(|e| AIError::GenerationFailed(format!("tool call arguments failed to parse: {e}")))?;
    Ok(CompletedToolCall {
        id: call.id.clone(),
        tool_name: call.function.name.clone(),
        arguments,
    })
}

pub fn to_tool_call_request(call: &CompletedToolCall) -> ToolCallRequest {
    ToolCallRequest {
        id: call.id.clone(),
        kind: "function".to_string(),
        function: FunctionCallRequest {
            name: call.tool_name.clone(),
            arguments: call.arguments.render(),
        },
    }
}

/// `finish_reason` strings recognised by every OpenAI-compatible backend.
pub fn finish_reason(raw: &str) -> conduit_core::FinishReason {
    match raw {
        "length" => conduit_core::FinishReason::MaxTokens,
        "tool_calls" => conduit_core::FinishReason::ToolUse,
        "content_filter" => conduit_core::FinishReason::ContentFilter,
        "stop" => conduit_core::FinishReason::Stop,
        _ => conduit_core::FinishReason::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::ToolDefinition;

    #[test]
    fn tool_choice_auto_serializes_to_string() {
        assert_eq!(to_tool_choice(&ToolChoice::Auto), serde_json::json!("auto"));
    }

    #[test]
    fn tool_choice_named_serializes_to_function_object() {
        let choice = ToolChoice::Tool { name: "weather".to_string() };
        let json = to_tool_choice(&choice);
        assert_eq!(json["function"]["name"], "weather");
    }

    #[test]
    fn request_omits_tools_when_none_configured() {
        let config = GenerateConfig::new();
        let request = to_request("gpt-4o", &[Message::user("hi")], &config, false);
        assert!(request.tools.is_none());
        assert!(!request.stream);
    }

    #[test]
    fn request_carries_tool_schemas() {
        let tool = ToolDefinition {
            name: "weather".to_string(),
            description: "gets the weather".to_string(),
            parameters: conduit_core::Schema::Object {
                name: "WeatherArgs".to_string(),
                description: None,
                properties: Default::default(),
            },
        };
        let config = GenerateConfig::new().with_tools(vec![tool]);
        let request = to_request("gpt-4o", &[Message::user("hi")], &config, true);
        let tools = request.tools.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "weather");
    }

    #[test]
    fn assistant_message_carries_its_tool_calls_onto_the_wire() {
        let call = CompletedToolCall {
            id: "call_1".to_string(),
            tool_name: "weather".to_string(),
            arguments: StructuredContent::Object(Default::default()),
        };
        let message = Message::assistant_with_tool_calls("", vec![call]);
        let chat_message = to_chat_message(&message);
        let tool_calls = chat_message.tool_calls.unwrap();
        assert_eq!(tool_calls.len(), 1);
        assert_eq!(tool_calls[0].id, "call_1");
        assert_eq!(tool_calls[0].function.name, "weather");
    }

    #[test]
    fn known_finish_reasons_map_to_shared_enum() {
        assert_eq!(finish_reason("length"), conduit_core::FinishReason::MaxTokens);
        assert_eq!(finish_reason("tool_calls"), conduit_core::FinishReason::ToolUse);
        assert_eq!(finish_reason("stop"), conduit_core::FinishReason::Stop);
    }
}
