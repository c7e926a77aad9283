//! Converts the shared `conduit_core` request/response model to and from the
//! HuggingFace `text-generation` wire shapes.

use crate::api_types::{GenerationParameters, TextGenerationRequest};
use conduit_core::{FinishReason, GenerateConfig, Message, Role};

/// Flattens a conversation into a single prompt string the way HuggingFace's
/// `text-generation` task expects: one turn per line, role-prefixed, ending
/// with an open `Assistant:` line for the model to continue.
pub fn to_prompt(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        let role = match message.role {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::Tool => "Tool",
        };
        prompt.push_str(role);
        prompt.push_str(": ");
        prompt.push_str(&message.content.as_text());
        prompt.push('\n');
    }
    prompt.push_str("Assistant:");
    prompt
}

pub fn to_request(messages: &[Message], config: &GenerateConfig, stream: bool) -> TextGenerationRequest {
    TextGenerationRequest {
        inputs: to_prompt(messages),
        parameters: GenerationParameters {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_new_tokens: config.max_tokens,
            repetition_penalty: config.repetition_penalty,
            stop: config.stop_sequences.clone(),
            return_full_text: false,
        },
        stream,
    }
}

/// HuggingFace's `details.finish_reason` values: `length`, `eos_token`,
/// `stop_sequence`.
pub fn finish_reason(raw: &str) -> FinishReason {
    match raw {
        "length" => FinishReason::MaxTokens,
        "stop_sequence" => FinishReason::StopSequence,
        "eos_token" => FinishReason::Stop,
        _ => FinishReason::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_ends_with_an_open_assistant_turn() {
        let prompt = to_prompt(&[Message::user("hi")]);
        assert!(prompt.ends_with("Assistant:"));
        assert!(prompt.contains("User: hi"));
    }

    #[test]
    fn finish_reasons_map_per_the_documented_table() {
        assert_eq!(finish_reason("length"), FinishReason::MaxTokens);
        assert_eq!(finish_reason("eos_token"), FinishReason::Stop);
    }
}
