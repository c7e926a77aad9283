//! Decodes a HuggingFace Inference API error body into the shared `AIError`
//! taxonomy: `{"error": "...", "error_type": "..."}`.

use conduit_core::AIError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub fn decode_error(status: u16, body: &str, retry_after: Option<f64>) -> AIError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.error)
        .unwrap_or_else(|| body.to_string());
    AIError::from_status(status, message, retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_flat_error_field() {
        let body = r#"{"error":"Model too busy, unable to get response in less than 60 second(s)"}"#;
        let err = decode_error(503, body, None);
        assert!(matches!(err, AIError::ServerError { status_code: 503, .. }));
    }

    #[test]
    fn falls_back_to_raw_body_when_unparseable() {
        let err = decode_error(401, "unauthorized", None);
        assert!(matches!(err, AIError::AuthenticationFailed(m) if m == "unauthorized"));
    }
}
