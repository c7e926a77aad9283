//! Turns a prefix of a JSON document - as emitted incrementally by a
//! streaming model - into a syntactically valid JSON document.
//!
//! This has no direct analogue in the teacher crates (their "tool call
//! repair" hook re-asks the model rather than scanning characters); the
//! scanning algorithm here is original, built to satisfy the worked examples
//! and invariants a structured-output streaming pipeline needs.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JsonRepairError {
    #[error("nesting depth exceeded 100")]
    DepthExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjState {
    /// Expecting the next key (fresh object, or just past a comma).
    Key,
    /// A key just closed; expecting `:`.
    Colon,
    /// `:` was consumed; expecting/parsing a value.
    Value,
    /// A value just completed; expecting `,` or `}`.
    CommaOrClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrState {
    /// Expecting/parsing the next value (fresh array, or just past a comma).
    Value,
    /// A value just completed; expecting `,` or `]`.
    CommaOrClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Obj(ObjState),
    Arr(ArrState),
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    /// Byte offset of the last point at which this container was in a
    /// structurally complete state (empty container, or right after its
    /// most recently completed sibling value).
    last_safe: usize,
    /// Byte offset where the current pending bare (non-string) token began.
    value_start: usize,
}

const MAX_DEPTH: usize = 100;

/// Repairs `prefix` into a syntactically valid JSON document, dropping any
/// trailing half-written token or key so the result always parses.
pub fn repair(prefix: &str) -> Result<String, JsonRepairError> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;
    let mut string_is_key = false;

    for (idx, c) in prefix.char_indices() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
                if let Some(frame) = stack.last_mut() {
                    match &mut frame.kind {
                        FrameKind::Obj(state) => {
                            if string_is_key {
                                *state = ObjState::Colon;
                            } else {
                                *state = ObjState::CommaOrClose;
                                frame.last_safe = idx + 1;
                            }
                        }
                        FrameKind::Arr(state) => {
                            *state = ArrState::CommaOrClose;
                            frame.last_safe = idx + 1;
                        }
                    }
                }
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                string_is_key = matches!(stack.last(), Some(Frame { kind: FrameKind::Obj(ObjState::Key), .. }));
            }
            '{' => {
                stack.push(Frame { kind: FrameKind::Obj(ObjState::Key), last_safe: idx + 1, value_start: idx + 1 });
                if stack.len() > MAX_DEPTH {
                    return Err(JsonRepairError::DepthExceeded);
                }
            }
            '[' => {
                stack.push(Frame { kind: FrameKind::Arr(ArrState::Value), last_safe: idx + 1, value_start: idx + 1 });
                if stack.len() > MAX_DEPTH {
                    return Err(JsonRepairError::DepthExceeded);
                }
            }
            '}' | ']' => {
                let matches_top = matches!(
                    stack.last(),
                    Some(Frame { kind: FrameKind::Obj(_), .. }) if c == '}'
                ) || matches!(
                    stack.last(),
                    Some(Frame { kind: FrameKind::Arr(_), .. }) if c == ']'
                );
                if matches_top {
                    stack.pop();
                    if let Some(parent) = stack.last_mut() {
                        match &mut parent.kind {
                            FrameKind::Obj(state) => {
                                *state = ObjState::CommaOrClose;
                                parent.last_safe = idx + 1;
                            }
                            FrameKind::Arr(state) => {
                                *state = ArrState::CommaOrClose;
                                parent.last_safe = idx + 1;
                            }
                        }
                    }
                }
                // A mismatched closer is structural garbage from the most
                // recent opener's point of view; ignore it and keep scanning.
            }
            ',' => {
                if let Some(frame) = stack.last_mut() {
                    match &mut frame.kind {
                        FrameKind::Obj(state) => *state = ObjState::Key,
                        FrameKind::Arr(state) => *state = ArrState::Value,
                    }
                }
            }
            ':' => {
                if let Some(frame) = stack.last_mut() {
                    if let FrameKind::Obj(state) = &mut frame.kind {
                        *state = ObjState::Value;
                        frame.value_start = idx + c.len_utf8();
                    }
                }
            }
            _ => {}
        }
    }

    let effective_len = match stack.last() {
        None => prefix.len(),
        Some(frame) => {
            if in_string {
                frame.last_safe
            } else {
                match frame.kind {
                    FrameKind::Obj(ObjState::CommaOrClose) | FrameKind::Arr(ArrState::CommaOrClose) => prefix.len(),
                    FrameKind::Obj(ObjState::Value) | FrameKind::Arr(ArrState::Value) => {
                        let tail = prefix[frame.value_start..].trim();
                        if tail.is_empty() || is_complete_scalar_token(tail) {
                            prefix.len()
                        } else {
                            frame.last_safe
                        }
                    }
                    _ => frame.last_safe,
                }
            }
        }
    };

    if stack.is_empty() {
        return Ok(if effective_len == 0 { "{}".to_string() } else { prefix[..effective_len].to_string() });
    }

    let mut out = String::with_capacity(effective_len + stack.len());
    out.push_str(&prefix[..effective_len]);
    for frame in stack.iter().rev() {
        out.push(match frame.kind {
            FrameKind::Obj(_) => '}',
            FrameKind::Arr(_) => ']',
        });
    }
    Ok(out)
}

/// A value is "complete" if it ends in a closing quote (handled separately,
/// since strings are tracked via `in_string`), a JSON literal, or a numeric
/// character forming a syntactically valid number.
fn is_complete_scalar_token(tail: &str) -> bool {
    if tail == "true" || tail == "false" || tail == "null" {
        return true;
    }
    is_complete_number(tail)
}

fn is_complete_number(tail: &str) -> bool {
    let mut chars = tail.chars().peekable();
    if chars.peek() == Some(&'-') {
        chars.next();
    }
    let mut saw_digit = false;
    while matches!(chars.peek(), Some(d) if d.is_ascii_digit()) {
        chars.next();
        saw_digit = true;
    }
    if !saw_digit {
        return false;
    }
    if chars.peek() == Some(&'.') {
        chars.next();
        let mut saw_frac_digit = false;
        while matches!(chars.peek(), Some(d) if d.is_ascii_digit()) {
            chars.next();
            saw_frac_digit = true;
        }
        if !saw_frac_digit {
            return false;
        }
    }
    if matches!(chars.peek(), Some('e') | Some('E')) {
        chars.next();
        if matches!(chars.peek(), Some('+') | Some('-')) {
            chars.next();
        }
        let mut saw_exp_digit = false;
        while matches!(chars.peek(), Some(d) if d.is_ascii_digit()) {
            chars.next();
            saw_exp_digit = true;
        }
        if !saw_exp_digit {
            return false;
        }
    }
    chars.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_parseable(s: &str) {
        serde_json::from_str::<serde_json::Value>(s).unwrap_or_else(|e| panic!("not parseable: {s:?}: {e}"));
    }

    #[test]
    fn drops_dangling_key_string() {
        let repaired = repair(r#"{"t"#).unwrap();
        assert_eq!(repaired, "{}");
        assert_parseable(&repaired);
    }

    #[test]
    fn drops_dangling_value_string() {
        let repaired = repair(r#"{"title":"Pas"#).unwrap();
        assert_eq!(repaired, "{}");
        assert_parseable(&repaired);
    }

    #[test]
    fn closes_nested_array_mid_element() {
        let repaired = repair(r#"{"title":"Pasta","steps":["bo"#).unwrap();
        assert_eq!(repaired, r#"{"title":"Pasta","steps":[]}"#);
        assert_parseable(&repaired);
    }

    #[test]
    fn already_complete_document_is_unchanged() {
        let input = r#"{"title":"Pasta","steps":["boil"]}"#;
        assert_eq!(repair(input).unwrap(), input);
    }

    #[test]
    fn keeps_trailing_complete_number() {
        let repaired = repair(r#"{"count":5"#).unwrap();
        assert_eq!(repaired, r#"{"count":5}"#);
        assert_parseable(&repaired);
    }

    #[test]
    fn drops_trailing_partial_literal() {
        let repaired = repair(r#"{"ok":tru"#).unwrap();
        assert_eq!(repaired, "{}");
        assert_parseable(&repaired);
    }

    #[test]
    fn drops_trailing_comma_with_nothing_after() {
        let repaired = repair(r#"{"a":1,"#).unwrap();
        assert_eq!(repaired, r#"{"a":1}"#);
        assert_parseable(&repaired);
    }

    #[test]
    fn depth_cap_triggers_on_pathological_nesting() {
        let pathological: String = "{\"a\":".repeat(0) + &"[".repeat(101);
        assert_eq!(repair(&pathological), Err(JsonRepairError::DepthExceeded));
    }

    #[test]
    fn empty_prefix_with_no_container_becomes_empty_object() {
        assert_eq!(repair("").unwrap(), "{}");
    }

    #[test]
    fn monotone_partials_are_prefix_consistent() {
        let full = r#"{"title":"Pasta","steps":["boil"]}"#;
        let mut last_repaired = String::new();
        for i in 1..=full.len() {
            if !full.is_char_boundary(i) {
                continue;
            }
            let prefix = &full[..i];
            if let Ok(repaired) = repair(prefix) {
                assert_parseable(&repaired);
                last_repaired = repaired;
            }
        }
        assert_parseable(&last_repaired);
    }
}
