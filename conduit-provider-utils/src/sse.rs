//! Byte-to-line assembly and tool-call accumulation shared by every
//! streaming backend. Each provider crate still owns its own wire-event
//! schema (OpenAI-compatible `delta.tool_calls[i]` vs. Anthropic
//! `content_block_delta`); what's common across both is turning a raw byte
//! stream into complete `data: ` lines, and accumulating a tool call's
//! `arguments` string across many small deltas keyed by its position.

use conduit_core::AIError;
use indexmap::IndexMap;

const MAX_BYTE_BUFFER: usize = 4;
const MAX_LINE_BUFFER: usize = 50_000;
const MAX_TOOL_CALL_INDEX: usize = 100;
const MAX_ARGS_BUFFER: usize = 100_000;

/// Turns a raw byte stream into complete lines, buffering any bytes that
/// don't yet form a full UTF-8 sequence and any text that hasn't yet reached
/// a `\n`.
#[derive(Debug, Default)]
pub struct LineAssembler {
    byte_buffer: Vec<u8>,
    line_buffer: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `chunk` in, returning every complete line it produced (without
    /// the trailing `\n`). Incomplete trailing text stays buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, AIError> {
        self.byte_buffer.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.byte_buffer) {
                Ok(text) => {
                    self.line_buffer.push_str(text);
                    self.byte_buffer.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    if valid_up_to == 0 {
                        if self.byte_buffer.len() > MAX_BYTE_BUFFER {
                            return Err(AIError::GenerationFailed("invalid UTF-8 in stream".into()));
                        }
                        break;
                    }
                    let valid = std::str::from_utf8(&self.byte_buffer[..valid_up_to]).unwrap();
                    self.line_buffer.push_str(valid);
                    self.byte_buffer.drain(..valid_up_to);
                }
            }
        }

        if self.line_buffer.len() > MAX_LINE_BUFFER {
            return Err(AIError::GenerationFailed("SSE line buffer overflow".into()));
        }

        let mut lines = Vec::new();
        while let Some(pos) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=pos).collect();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        Ok(lines)
    }
}

/// One tool call's accumulating state, keyed by its stream-assigned index.
#[derive(Debug, Clone, Default)]
pub struct ToolCallAccumulator {
    pub id: Option<String>,
    pub name: Option<String>,
    pub args_buffer: String,
}

/// The per-index tool-call accumulator table described in the streaming
/// engine design: indices outside `0..=100` are dropped with a warning, and
/// each accumulator's `args_buffer` is capped at 100 000 bytes.
#[derive(Debug, Default)]
pub struct ToolCallAccumulatorTable {
    accumulators: IndexMap<usize, ToolCallAccumulator>,
}

impl ToolCallAccumulatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a delta fragment to the accumulator at `index`, creating it if
    /// absent. Returns the accumulator's current state if `index` was
    /// in-range, or `None` if it was dropped.
    pub fn apply_delta(
        &mut self,
        index: usize,
        id: Option<&str>,
        name: Option<&str>,
        arguments_fragment: Option<&str>,
    ) -> Option<&ToolCallAccumulator> {
        if index > MAX_TOOL_CALL_INDEX {
            log::warn!("dropping tool call delta at out-of-range index {index}");
            return None;
        }

        let entry = self.accumulators.entry(index).or_default();
        if let Some(id) = id {
            entry.id = Some(id.to_string());
        }
        if let Some(name) = name {
            entry.name = Some(name.to_string());
        }
        if let Some(fragment) = arguments_fragment {
            let remaining = MAX_ARGS_BUFFER.saturating_sub(entry.args_buffer.len());
            if remaining == 0 {
                log::warn!("tool call args buffer at index {index} truncated at {MAX_ARGS_BUFFER} bytes");
            } else if fragment.len() > remaining {
                entry.args_buffer.push_str(&fragment[..remaining]);
                log::warn!("tool call args buffer at index {index} truncated at {MAX_ARGS_BUFFER} bytes");
            } else {
                entry.args_buffer.push_str(fragment);
            }
        }
        self.accumulators.get(&index)
    }

    /// Drains every accumulator in index order, for finalisation once a
    /// terminal `tool_calls`/`tool_use` event arrives.
    pub fn drain(&mut self) -> Vec<(usize, ToolCallAccumulator)> {
        let mut entries: Vec<_> = self.accumulators.drain(..).collect();
        entries.sort_by_key(|(index, _)| *index);
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_lines_split_across_feeds() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.feed(b"data: hel").unwrap().is_empty());
        let lines = assembler.feed(b"lo\ndata: world\n").unwrap();
        assert_eq!(lines, vec!["data: hello", "data: world"]);
    }

    #[test]
    fn reassembles_a_multi_byte_utf8_character_split_across_feeds() {
        let mut assembler = LineAssembler::new();
        let snowman = "☃".as_bytes();
        assert!(assembler.feed(&snowman[..1]).unwrap().is_empty());
        let lines = assembler.feed(&[&snowman[1..], b"\n"].concat()).unwrap();
        assert_eq!(lines, vec!["☃"]);
    }

    #[test]
    fn line_buffer_overflow_is_an_error() {
        let mut assembler = LineAssembler::new();
        let huge = "a".repeat(MAX_LINE_BUFFER + 1);
        assert!(assembler.feed(huge.as_bytes()).is_err());
    }

    #[test]
    fn out_of_range_index_is_dropped() {
        let mut table = ToolCallAccumulatorTable::new();
        assert!(table.apply_delta(101, Some("x"), None, None).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn accumulates_arguments_across_deltas() {
        let mut table = ToolCallAccumulatorTable::new();
        table.apply_delta(0, Some("call_1"), Some("get_weather"), Some(r#"{"loc"#));
        table.apply_delta(0, None, None, Some(r#"ation":"nyc"}"#));
        let entries = table.drain();
        assert_eq!(entries.len(), 1);
        let (index, acc) = &entries[0];
        assert_eq!(*index, 0);
        assert_eq!(acc.id.as_deref(), Some("call_1"));
        assert_eq!(acc.name.as_deref(), Some("get_weather"));
        assert_eq!(acc.args_buffer, r#"{"location":"nyc"}"#);
    }

    #[test]
    fn args_buffer_truncates_with_a_warning_past_the_cap() {
        let mut table = ToolCallAccumulatorTable::new();
        let huge = "a".repeat(MAX_ARGS_BUFFER + 10);
        table.apply_delta(0, None, None, Some(&huge));
        let entries = table.drain();
        assert_eq!(entries[0].1.args_buffer.len(), MAX_ARGS_BUFFER);
    }
}
