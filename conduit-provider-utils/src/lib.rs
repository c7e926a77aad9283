//! # conduit-provider-utils
//!
//! Shared plumbing every Conduit backend crate (`conduit-openai-compatible`,
//! `conduit-anthropic`, `conduit-huggingface`, `conduit-local`) pulls in, so
//! the SSE byte-assembly, retry policy and JSON repair logic are written
//! once rather than duplicated per provider.
//!
//! Data model types (`Message`, `Content`, `ToolDefinition`, ...) live one
//! layer down, in `conduit-core` — this crate only adds behavior on top of
//! them.
//!
//! ## Architecture
//!
//! ```text
//! conduit (facade, public API)
//!      ↓
//! conduit-provider-utils (this crate: retry, SSE, JSON repair)
//!      ↓
//! conduit-core (data model, error taxonomy, provider contract)
//! ```
//!
//! Backend crates depend on both `conduit-core` (for the types they
//! implement against) and this crate (for the mechanics of talking to an
//! HTTP streaming API reliably).

#![warn(missing_docs)]

/// Turns a prefix of a streamed JSON document into something that parses,
/// by dropping whatever trailing token is still incomplete.
pub mod json_repair;

/// Exponential backoff retry over `AIError`'s retryable/non-retryable
/// classification.
pub mod retry;

/// SSE byte/line assembly and per-index tool-call argument accumulation.
pub mod sse;

pub use json_repair::{repair as repair_json, JsonRepairError};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use sse::{LineAssembler, ToolCallAccumulator, ToolCallAccumulatorTable};
