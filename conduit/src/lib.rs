//! # conduit
//!
//! The facade crate of Conduit, a unified client library fronting multiple
//! LLM inference backends (Anthropic, OpenAI-compatible, HuggingFace, and a
//! local on-device adapter). This crate provides the mechanics every backend
//! shares above the wire level:
//!
//! - [`http_executor`]: builds and retries a single JSON HTTP request,
//!   extracting rate-limit metadata from response headers.
//! - [`structured_stream`]: turns a raw chunk stream into a sequence of
//!   partial, then complete, strongly-typed values for a [`Generable`] type.
//! - [`tool_executor`]: the multi-step generate/execute-tools/continue loop.
//!
//! Backend crates (`conduit-anthropic`, `conduit-openai-compatible`,
//! `conduit-huggingface`, `conduit-local`) each implement
//! [`conduit_core::AIProvider`] and depend on `conduit-core` and
//! `conduit-provider-utils` directly; this crate does not depend on them, to
//! avoid a cycle with the integration tests they run against it.
//!
//! Data model types (`Message`, `GenerationResult`, `AIError`, ...) are
//! re-exported from `conduit-core` for convenience, so a caller who only
//! needs the facade rarely needs to depend on `conduit-core` directly.

#![warn(missing_docs)]

/// HTTP request execution with exponential-backoff retry, shared by every
/// cloud backend crate.
pub mod http_executor;
/// Structured (partial-then-complete) output decoding over a raw chunk stream.
pub mod structured_stream;
/// The multi-step tool execution loop.
pub mod tool_executor;

pub use conduit_core::{
    AIError, AIProvider, Availability, Capability, CompletedToolCall, Content, ContentPart,
    FinishReason, Generable, GenerateConfig, GenerationChunk, GenerationResult, Message,
    PartialToolCall, RateLimitInfo, Role, Schema, ServiceTier, StructuredContent, ToolChoice,
    ToolDefinition, UnavailableReason, Usage,
};
pub use structured_stream::{schema_for, structured_stream, StructuredEvent};
pub use tool_executor::{Tool, ToolError, ToolExecutor};

use futures::stream::BoxStream;

/// Runs a single non-streaming generation against `provider`. A thin
/// delegator kept at the facade level so callers depending only on `conduit`
/// never need to name `conduit_core::AIProvider` themselves.
pub async fn generate(
    provider: &dyn AIProvider,
    messages: &[Message],
    model: &str,
    config: &GenerateConfig,
) -> Result<GenerationResult, AIError> {
    provider.generate(messages, model, config).await
}

/// Runs a streaming generation against `provider`.
pub async fn stream(
    provider: &dyn AIProvider,
    messages: &[Message],
    model: &str,
    config: &GenerateConfig,
) -> Result<BoxStream<'static, Result<GenerationChunk, AIError>>, AIError> {
    provider.stream(messages, model, config).await
}
