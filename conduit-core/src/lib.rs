//! Conduit core - shared data model, error taxonomy and provider contract.
//!
//! This crate defines the provider-agnostic types that every Conduit backend
//! (Anthropic, OpenAI-compatible, HuggingFace, local on-device) builds requests
//! from and parses responses into. It has no HTTP client and no per-provider
//! wire-protocol knowledge; those live in the backend crates.
//!
//! # Core types
//!
//! - [`StructuredContent`]: a tagged, JSON-isomorphic value used as the pivot
//!   between wire JSON and user-declared record types.
//! - [`Schema`]: a JSON-Schema-like descriptor of a generable record type.
//! - [`Message`], [`GenerateConfig`]: the wire-level request model.
//! - [`GenerationResult`], [`GenerationChunk`]: the wire-level response model.
//! - [`AIError`]: the closed error taxonomy every backend maps its wire errors into.
//! - [`AIProvider`]: the contract backends implement.

pub mod error;
pub mod generable;
pub mod generate_config;
pub mod generation;
pub mod message;
pub mod provider;
pub mod schema;
pub mod structured_content;

pub use error::AIError;
pub use generable::{Generable, PartialGenerable};
pub use generate_config::{GenerateConfig, ServiceTier, ToolChoice, ToolDefinition};
pub use generation::{
    tokens_per_second, CompletedToolCall, FinishReason, GenerationChunk, GenerationResult,
    PartialToolCall, RateLimitInfo, Usage,
};
pub use message::{Content, ContentPart, ImagePart, Message, Role};
pub use provider::{AIProvider, Availability, Capability, UnavailableReason};
pub use schema::{Constraint, Property, Schema};
pub use structured_content::{StructuredContent, StructuredContentError};
