//! Turns the Anthropic Messages SSE byte stream into [`GenerationChunk`]s.
//! Anthropic's events are two lines (`event: <kind>` then `data: {...}`)
//! rather than OpenAI's single `data:` line, so the decoder tracks the
//! pending event kind across lines before dispatching on it.

use crate::api_types::{ContentBlockDelta, ContentBlockStart, ContentBlockStartInner, DeltaInner, MessageDelta, MessageStart};
use crate::convert::stop_reason;
use conduit_core::{AIError, CompletedToolCall, GenerationChunk, PartialToolCall, StructuredContent, Usage};
use conduit_provider_utils::{LineAssembler, ToolCallAccumulatorTable};
use futures::stream::{BoxStream, StreamExt};
use reqwest::Response;
use std::time::Instant;

pub fn decode_sse_stream(response: Response) -> BoxStream<'static, Result<GenerationChunk, AIError>> {
    let stream = async_stream::try_stream! {
        let mut bytes = response.bytes_stream();
        let mut assembler = LineAssembler::new();
        let mut tool_calls = ToolCallAccumulatorTable::new();
        let mut pending_event: Option<String> = None;
        let started_at = Instant::now();
        let mut accumulated_tokens: u32 = 0;
        let mut final_usage: Option<Usage> = None;

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| AIError::NetworkError(e.to_string()))?;
            for line in assembler.feed(&chunk)? {
                if let Some(kind) = line.strip_prefix("event: ").or_else(|| line.strip_prefix("event:")) {
                    pending_event = Some(kind.trim().to_string());
                    continue;
                }
                let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() {
                    continue;
                }
                let Some(kind) = pending_event.take() else { continue };

                match kind.as_str() {
                    "message_start" => {
                        let start: MessageStart = serde_json::from_str(data)
                            .map_err(|e| AIError::GenerationFailed(format!("malformed message_start: {e}")))?;
                        final_usage = Some(Usage {
                            prompt_tokens: start.message.usage.input_tokens,
                            completion_tokens: start.message.usage.output_tokens,
                            total_tokens: start.message.usage.input_tokens + start.message.usage.output_tokens,
                        });
                    }
                    "content_block_start" => {
                        let event: ContentBlockStart = serde_json::from_str(data)
                            .map_err(|e| AIError::GenerationFailed(format!("malformed content_block_start: {e}")))?;
                        if let ContentBlockStartInner::ToolUse { id, name } = event.content_block {
                            tool_calls.apply_delta(event.index, Some(&id), Some(&name), None);
                        }
                    }
                    "content_block_delta" => {
                        let event: ContentBlockDelta = serde_json::from_str(data)
                            .map_err(|e| AIError::GenerationFailed(format!("malformed content_block_delta: {e}")))?;
                        match event.delta {
                            DeltaInner::TextDelta { text } => {
                                if !text.is_empty() {
                                    accumulated_tokens += 1;
                                    let tps = conduit_core::tokens_per_second(accumulated_tokens, started_at.elapsed());
                                    yield GenerationChunk::content(text, accumulated_tokens, tps);
                                }
                            }
                            DeltaInner::InputJsonDelta { partial_json } => {
                                if let Some(acc) = tool_calls.apply_delta(event.index, None, None, Some(&partial_json)) {
                                    yield GenerationChunk::partial_tool_call(PartialToolCall {
                                        id: acc.id.clone().unwrap_or_default(),
                                        tool_name: acc.name.clone().unwrap_or_default(),
                                        index: event.index as u32,
                                        arguments_fragment: acc.args_buffer.clone(),
                                    });
                                }
                            }
                        }
                    }
                    "message_delta" => {
                        let event: MessageDelta = serde_json::from_str(data)
                            .map_err(|e| AIError::GenerationFailed(format!("malformed message_delta: {e}")))?;
                        if let Some(usage) = event.usage {
                            let prompt = final_usage.map(|u| u.prompt_tokens).unwrap_or(0);
                            final_usage = Some(Usage {
                                prompt_tokens: prompt,
                                completion_tokens: usage.output_tokens,
                                total_tokens: prompt + usage.output_tokens,
                            });
                        }
                        if let Some(raw_reason) = event.delta.stop_reason {
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
                            yield GenerationChunk::finish(stop_reason(&raw_reason), final_usage, completed);
                        }
                    }
                    "message_stop" => break,
                    _ => {}
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
    fn stop_reasons_used_by_the_decoder_map_correctly() {
        assert_eq!(stop_reason("tool_use"), conduit_core::FinishReason::ToolUse);
    }
}
