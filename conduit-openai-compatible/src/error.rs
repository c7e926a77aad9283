//! Decodes an OpenAI-compatible error body into the shared `AIError`
//! taxonomy. Every OpenAI-shaped backend (OpenAI, OpenRouter, Ollama, Azure,
//! custom) reports errors the same way: `{"error": {"message": ...}}`.

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

/// Maps an HTTP status code and raw response body to an `AIError`, per the
/// shared status-code table in `conduit_core::AIError::from_status`.
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
        let body = r#"{"error":{"message":"invalid api key","type":"invalid_request_error"}}"#;
        let err = decode_error(401, body, None);
        assert!(matches!(err, AIError::AuthenticationFailed(m) if m == "invalid api key"));
    }

    #[test]
    fn falls_back_to_raw_body_when_unparseable() {
        let err = decode_error(500, "upstream exploded", None);
        assert!(matches!(err, AIError::ServerError { message, .. } if message == "upstream exploded"));
    }
}
