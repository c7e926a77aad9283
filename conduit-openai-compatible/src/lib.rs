//! # conduit-openai-compatible
//!
//! The OpenAI-compatible Chat Completions backend: one wire dialect serving
//! OpenAI, OpenRouter, Ollama, Azure OpenAI, and any custom deployment that
//! speaks the same JSON/SSE shape. Distinguished only by base URL,
//! authentication header style, and default model — see
//! [`OpenAiCompatibleConfig`].

#![warn(missing_docs)]

mod api_types;
/// Request/response conversion between the shared data model and the wire
/// JSON shapes in [`api_types`].
pub mod convert;
/// Maps an OpenAI-compatible error body to the shared `AIError` taxonomy.
pub mod error;
/// The `AIProvider` implementation.
pub mod provider;
/// SSE decoding into `GenerationChunk`s.
pub mod stream;

pub use provider::{AuthStyle, OpenAiCompatibleConfig, OpenAiCompatibleProvider};

/// The well-known base URLs and environment variables for OpenAI itself and
/// OpenRouter, both speaking the unmodified dialect.
pub mod presets {
    /// `https://api.openai.com/v1/chat/completions`, reading `OPENAI_API_KEY`.
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
    /// `https://openrouter.ai/api/v1/chat/completions`, reading `OPENROUTER_API_KEY`.
    pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
}
