//! Turns a TGI-style SSE byte stream into [`GenerationChunk`]s. HuggingFace's
//! `text-generation` streaming frames carry one token per event and never
//! carry tool calls; the only terminal signal is `details.finish_reason`.

use crate::convert::finish_reason;
use crate::api_types::StreamFrame;
use conduit_core::{AIError, GenerationChunk};
use conduit_provider_utils::LineAssembler;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Response;
use std::time::Instant;

pub fn decode_sse_stream(response: Response) -> BoxStream<'static, Result<GenerationChunk, AIError>> {
    let stream = async_stream::try_stream! {
        let mut bytes = response.bytes_stream();
        let mut assembler = LineAssembler::new();
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

                let frame: StreamFrame = serde_json::from_str(data)
                    .map_err(|e| AIError::GenerationFailed(format!("malformed SSE event: {e}")))?;

                if !frame.token.special && !frame.token.text.is_empty() {
                    accumulated_tokens += 1;
                    let tps = conduit_core::tokens_per_second(accumulated_tokens, started_at.elapsed());
                    yield GenerationChunk::content(frame.token.text, accumulated_tokens, tps);
                }

                if let Some(details) = frame.details {
                    let reason = details.finish_reason.as_deref().map(finish_reason).unwrap_or(conduit_core::FinishReason::Stop);
                    yield GenerationChunk::finish(reason, None, None);
                    break 'outer;
                }
            }
        }
    };

    Box::pin(stream)
}
