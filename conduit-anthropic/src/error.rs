//! Decodes an Anthropic Messages API error body into the shared `AIError`
//! taxonomy: `{"type":"error","error":{"type":"...","message":"..."}}`.

use conduit_core::AIError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub fn decode_error(status: u16, body: &str, retry_after: Option<f64>) -> AIError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string());
    AIError::from_status(status, message, retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_error_message() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"overloaded"}}"#;
        let err = decode_error(529, body, None);
        assert!(matches!(err, AIError::GenerationFailed(m) if m == "overloaded"));
    }

    #[test]
    fn falls_back_to_raw_body_when_unparseable() {
        let err = decode_error(401, "nope", None);
        assert!(matches!(err, AIError::AuthenticationFailed(m) if m == "nope"));
    }
}
