//! Turns the raw SSE byte stream from an OpenAI-compatible endpoint into
//! [`GenerationChunk`]s, per the event-recognition rules in the streaming
//! engine design: `choices[0].delta.content` is a content chunk;
//! `choices[0].delta.tool_calls[i]` feeds the shared per-index accumulator
//! table; `finish_reason` (with `[DONE]` following) ends the stream.

use crate::api_types::StreamChunk;
use crate::convert::finish_reason;
use conduit_core::{AIError, CompletedToolCall, GenerationChunk, PartialToolCall, StructuredContent};
use conduit_provider_utils::{LineAssembler, ToolCallAccumulatorTable};
use futures::stream::{BoxStream, StreamExt};
use reqwest::Response;
use std::time::Instant;

/// Consumes `response`'s body as an OpenAI-compatible SSE stream, yielding
/// [`GenerationChunk`]s in arrival order.
pub fn decode_sse_stream(response: Response) -> BoxStream<'static, Result<GenerationChunk, AIError>> {
    let stream = async_stream::try_stream! {
        let mut bytes = response.bytes_stream();
        let mut assembler = LineAssembler::new();
        let mut tool_calls = ToolCallAccumulatorTable::new();
        let started_at = Instant::now();
        let mut accumulated_tokens: u32 = 0;

        'outer: while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| AIError::NetworkError(e.to_string()))?;
            for line in assembler.feed(&chunk)? {
                let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    break 'outer;
                }

                let event: StreamChunk = serde_json::from_str(data)
                    .map_err(|e| AIError::GenerationFailed(format!("malformed SSE event: {e}")))?;

                let Some(choice) = event.choices.into_iter().next() else { continue };

                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        accumulated_tokens += 1;
                        let elapsed = started_at.elapsed();
                        let tps = conduit_core::tokens_per_second(accumulated_tokens, elapsed);
                        yield GenerationChunk::content(text, accumulated_tokens, tps);
                    }
                }

                if let Some(deltas) = choice.delta.tool_calls {
                    for delta in deltas {
                        let function = delta.function.as_ref();
                        let name = function.and_then(|f| f.name.as_deref());
                        let arguments = function.and_then(|f| f.arguments.as_deref());
                        if let Some(acc) = tool_calls.apply_delta(delta.index, delta.id.as_deref(), name, arguments) {
                            yield GenerationChunk::partial_tool_call(PartialToolCall {
                                id: acc.id.clone().unwrap_or_default(),
                                tool_name: acc.name.clone().unwrap_or_default(),
                                index: delta.index as u32,
                                arguments_fragment: acc.args_buffer.clone(),
                            });
                        }
                    }
                }

                if let Some(raw_reason) = choice.finish_reason {
                    let completed = if tool_calls.is_empty() {
                        None
                    } else {
                        let mut out = Vec::new();
                        for (_, acc) in tool_calls.drain() {
                            let arguments = conduit_provider_utils::repair_json(&acc.args_buffer)
                                .ok()
                                .and_then(|repaired| StructuredContent::parse(&repaired).ok());
                            let Some(arguments) = arguments else {
                                log::warn!(
                                    "dropping tool call {:?} (name {:?}): arguments failed to repair/parse: {:?}",
                                    acc.id, acc.name, acc.args_buffer
                                );
                                continue;
                            };
                            out.push(CompletedToolCall {
                                id: acc.id.unwrap_or_default(),
                                tool_name: acc.name.unwrap_or_default(),
                                arguments,
                            });
                        }
                        Some(out)
                    };
                    let usage = event.usage.map(|u| conduit_core::Usage {
                        prompt_tokens: u.prompt_tokens,
                        completion_tokens: u.completion_tokens,
                        total_tokens: u.total_tokens,
                    });
                    yield GenerationChunk::finish(finish_reason(&raw_reason), usage, completed);
                    break 'outer;
                }
            }
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_finish_reasons_round_trip_through_shared_enum() {
        assert_eq!(finish_reason("stop"), conduit_core::FinishReason::Stop);
        assert_eq!(finish_reason("tool_calls"), conduit_core::FinishReason::ToolUse);
    }
}
