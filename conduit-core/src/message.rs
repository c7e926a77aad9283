//! The wire-level conversation model shared across every backend.

use crate::generation::CompletedToolCall;
use serde::{Deserialize, Serialize};

/// The role a [`Message`] was authored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single multimodal content part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentPart {
    Text(String),
    Image(ImagePart),
}

/// An inline (base64) or remote (url) image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePart {
    pub source: ImageSource,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImageSource {
    Base64 { data: String },
    Url { url: String },
}

/// A message's content: either plain text or a sequence of multimodal parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Flattens to the concatenation of any text parts, ignoring images.
    /// Used by token-counting and local-adapter prompt construction, which
    /// only ever consume the textual signal.
    pub fn as_text(&self) -> String {
        match self {
            Content::Text(t) => t.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text(t) => Some(t.as_str()),
                    ContentPart::Image(_) => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
    /// Present on `tool` messages: the id of the call this message answers.
    pub tool_call_id: Option<String>,
    /// Present on `tool` messages: the name of the tool that was invoked.
    pub tool_name: Option<String>,
    /// Present on `assistant` messages that requested tool calls: the calls
    /// made in that turn, carried so a backend can reconstruct the wire-level
    /// tool-call/tool-use blocks a later `tool`-role reply's `tool_call_id`
    /// must reference.
    pub tool_calls: Option<Vec<CompletedToolCall>>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: Content::Text(text.into()),
            tool_call_id: None,
            tool_name: None,
            tool_calls: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: Content::Text(text.into()),
            tool_call_id: None,
            tool_name: None,
            tool_calls: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: Content::Text(text.into()),
            tool_call_id: None,
            tool_name: None,
            tool_calls: None,
        }
    }

    /// An assistant turn that requested one or more tool calls, carried
    /// alongside any text the model produced in the same turn.
    pub fn assistant_with_tool_calls(text: impl Into<String>, tool_calls: Vec<CompletedToolCall>) -> Self {
        Message {
            role: Role::Assistant,
            content: Content::Text(text.into()),
            tool_call_id: None,
            tool_name: None,
            tool_calls: Some(tool_calls),
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, tool_name: impl Into<String>, text: impl Into<String>) -> Self {
        Message {
            role: Role::Tool,
            content: Content::Text(text.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
            tool_calls: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_flattens_trivially() {
        let msg = Message::user("hello");
        assert_eq!(msg.content.as_text(), "hello");
    }

    #[test]
    fn multimodal_content_drops_images_from_text_view() {
        let content = Content::Parts(vec![
            ContentPart::Text("see: ".to_string()),
            ContentPart::Image(ImagePart {
                source: ImageSource::Url { url: "https://example.com/x.png".to_string() },
                mime_type: "image/png".to_string(),
            }),
            ContentPart::Text("cat".to_string()),
        ]);
        assert_eq!(content.as_text(), "see: cat");
    }

    #[test]
    fn tool_message_carries_call_id_and_name() {
        let msg = Message::tool("call_1", "weather", "{\"city\":\"Paris\"}");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.tool_name.as_deref(), Some("weather"));
    }

    #[test]
    fn assistant_with_tool_calls_carries_the_requested_calls() {
        let call = CompletedToolCall {
            id: "call_1".to_string(),
            tool_name: "weather".to_string(),
            arguments: crate::StructuredContent::Object(Default::default()),
        };
        let msg = Message::assistant_with_tool_calls("", vec![call.clone()]);
        assert_eq!(msg.tool_calls, Some(vec![call]));
    }
}
