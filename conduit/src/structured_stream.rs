//! Wraps a provider's `GenerationChunk` stream into a stream of partial and
//! then complete structured values, per the structured streaming design:
//! accumulate raw text, repair it into parseable JSON after every chunk, and
//! emit a new partial only when it differs from the last one emitted.

use conduit_core::{AIError, Generable, Schema};
use futures::stream::{BoxStream, StreamExt};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const MAX_ACCUMULATED_BYTES: usize = 1024 * 1024;

/// One event from a structured stream: an incrementally-built partial value,
/// or the final, fully-typed result.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredEvent<T: Generable> {
    Partial(T::Partial),
    Complete(T),
}

/// Consumes `chunks` (a provider's raw content stream) and yields
/// [`StructuredEvent`]s for `T`, per §4.7. The target type's declared
/// [`Schema`] is available via `T::schema()` for callers that want to send it
/// to the provider as a structured-output constraint; this function only
/// handles the client-side decode half.
pub fn structured_stream<T: Generable + Send + 'static>(
    mut chunks: BoxStream<'static, Result<conduit_core::GenerationChunk, AIError>>,
) -> BoxStream<'static, Result<StructuredEvent<T>, AIError>>
where
    T::Partial: Send,
{
    let stream = async_stream::try_stream! {
        let mut accumulated = String::new();
        let mut last_hash: Option<u64> = None;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            accumulated.push_str(&chunk.text);
            if accumulated.len() > MAX_ACCUMULATED_BYTES {
                Err(AIError::InvalidInput("structured output exceeded 1 MiB".to_string()))?;
            }

            if !chunk.is_complete {
                if let Ok(repaired) = conduit_provider_utils::repair_json(&accumulated) {
                    if let Ok(content) = conduit_core::StructuredContent::parse(&repaired) {
                        if let Ok(partial) = T::Partial::from_partial_content(&content) {
                            let mut hasher = DefaultHasher::new();
                            partial.hash(&mut hasher);
                            let hash = hasher.finish();
                            if last_hash != Some(hash) {
                                last_hash = Some(hash);
                                yield StructuredEvent::Partial(partial);
                            }
                        }
                    }
                }
                continue;
            }

            let content = conduit_core::StructuredContent::parse(&accumulated)
                .map_err(|e| AIError::GenerationFailed(format!("final structured output failed to parse: {e}")))?;
            let complete = T::from_structured_content(&content)
                .map_err(|e| AIError::GenerationFailed(format!("final structured output mismatched schema: {e}")))?;
            yield StructuredEvent::Complete(complete);
        }
    };

    Box::pin(stream)
}

/// Returns the schema a caller should pass to the provider as a
/// structured-output constraint for `T`.
pub fn schema_for<T: Generable>() -> Schema {
    T::schema()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{GenerationChunk, PartialGenerable, Property, StructuredContent, StructuredContentError};

    #[derive(Debug, Clone, PartialEq)]
    struct Recipe {
        title: String,
    }

    #[derive(Debug, Clone, PartialEq, Eq, std::hash::Hash)]
    struct RecipePartial {
        title: Option<String>,
    }

    impl Generable for Recipe {
        type Partial = RecipePartial;

        fn schema() -> Schema {
            let mut properties = indexmap::IndexMap::new();
            properties.insert(
                "title".to_string(),
                Property::required(Schema::String { constraints: vec![] }, None),
            );
            Schema::Object { name: "Recipe".to_string(), description: None, properties }
        }

        fn to_structured_content(&self) -> StructuredContent {
            let mut obj = indexmap::IndexMap::new();
            obj.insert("title".to_string(), StructuredContent::String(self.title.clone()));
            StructuredContent::Object(obj)
        }

        fn from_structured_content(content: &StructuredContent) -> Result<Self, StructuredContentError> {
            Ok(Recipe { title: content.get("title")?.as_str()?.to_string() })
        }
    }

    impl PartialGenerable<Recipe> for RecipePartial {
        fn from_partial_content(content: &StructuredContent) -> Result<Self, StructuredContentError> {
            let title = match content.get("title") {
                Ok(v) => Some(v.as_str()?.to_string()),
                Err(_) => None,
            };
            Ok(RecipePartial { title })
        }
    }

    fn content_chunk(text: &str) -> Result<GenerationChunk, AIError> {
        Ok(GenerationChunk::content(text, 1, None))
    }

    fn final_chunk() -> Result<GenerationChunk, AIError> {
        Ok(GenerationChunk::finish(conduit_core::FinishReason::Stop, None, None))
    }

    #[tokio::test]
    async fn emits_partials_then_a_complete_value() {
        let chunks: Vec<Result<GenerationChunk, AIError>> = vec![
            content_chunk(r#"{"title":"Pas"#),
            content_chunk(r#"ta"}"#),
            final_chunk(),
        ];
        let stream: BoxStream<'static, Result<GenerationChunk, AIError>> = Box::pin(futures::stream::iter(chunks));
        let mut events = structured_stream::<Recipe>(stream);

        let mut saw_complete = false;
        while let Some(event) = events.next().await {
            if let StructuredEvent::Complete(recipe) = event.unwrap() {
                assert_eq!(recipe.title, "Pasta");
                saw_complete = true;
            }
        }
        assert!(saw_complete);
    }
}
