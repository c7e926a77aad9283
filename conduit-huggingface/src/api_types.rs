//! Wire types for the HuggingFace Inference API's `text-generation` task.
//! Embeddings, transcription and text-to-image tasks use different,
//! non-JSON-conversation body shapes and are out of scope for this backend
//! (see the crate's top-level docs).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct GenerationParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    pub return_full_text: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextGenerationRequest {
    pub inputs: String,
    pub parameters: GenerationParameters,
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextGenerationResponse {
    pub generated_text: String,
    #[serde(default)]
    pub details: Option<GenerationDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationDetails {
    #[serde(default)]
    pub generated_tokens: u32,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// One `data: {...}` streaming frame emitted by a TGI-backed endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamFrame {
    pub token: Token,
    #[serde(default)]
    pub generated_text: Option<String>,
    #[serde(default)]
    pub details: Option<StreamDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub text: String,
    #[serde(default)]
    pub special: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamDetails {
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub generated_tokens: u32,
}
