//! The `Generable` contract: the runtime-facing half of the source's
//! code-generated "generable" types (§9 design note). In Swift the macro
//! derives a `Schema`, a `StructuredContent` conversion, and a mirror
//! `Partial` type whose every field is optional. Here that becomes a trait a
//! user type implements (by hand today; a `#[derive(Generable)]` proc macro
//! is a natural follow-up, mirrored on the teacher's `TypeSafeTool` pattern
//! in `ai-sdk-core/src/tool/type_safe.rs`, which derives a JSON schema from a
//! `schemars::JsonSchema` impl the same way).

use crate::schema::Schema;
use crate::structured_content::{StructuredContent, StructuredContentError};

/// A user-declared record type that can be described as a [`Schema`],
/// encoded to [`StructuredContent`] (total), and decoded back (partial,
/// fallible only on type mismatches — never on missing fields).
pub trait Generable: Sized {
    /// The streaming mirror of `Self`: every field optional, built
    /// incrementally from a possibly-incomplete `StructuredContent`.
    type Partial: PartialGenerable<Self>;

    /// The structural descriptor of this type, used both for provider-side
    /// structured-output requests and for documentation.
    fn schema() -> Schema;

    /// A total, one-way encoding to the wire pivot type.
    fn to_structured_content(&self) -> StructuredContent;

    /// The fallible inverse of `to_structured_content`, used once a stream
    /// has produced a fully-formed document.
    fn from_structured_content(content: &StructuredContent) -> Result<Self, StructuredContentError>;
}

/// The partial (all-optional-fields) mirror of a [`Generable`] type, built
/// incrementally from a [`StructuredContent`] that may still be missing
/// fields the final document will have. Never fails on a missing field;
/// only on a field that is present but has the wrong shape.
pub trait PartialGenerable<T>: Sized + PartialEq + std::hash::Hash {
    fn from_partial_content(content: &StructuredContent) -> Result<Self, StructuredContentError>;
}
