//! The shared HTTP executor every cloud backend builds its requests through:
//! serialize, send with a per-request deadline, classify the response, and
//! retry transient failures with backoff honoring `Retry-After`.
//!
//! Grounded in the teacher's `generate_text::retries` exponential-backoff
//! loop, generalized from a bare `RetryFunction` closure to an executor that
//! also owns response classification and `RateLimitInfo` extraction, since
//! those concerns are identical across every cloud backend here.

use conduit_core::AIError;
use conduit_provider_utils::{retry_with_backoff, RetryPolicy};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Rate-limit metadata extracted from well-known response headers (§4.4).
/// Returns `None` for every field the response didn't set.
pub fn extract_rate_limit_info(headers: &HeaderMap) -> conduit_core::RateLimitInfo {
    fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }
    fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
        header_str(headers, name).and_then(|v| v.parse().ok())
    }
    fn header_timestamp(headers: &HeaderMap, name: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        header_str(headers, name).and_then(|v| chrono::DateTime::parse_from_rfc3339(v).ok()).map(|dt| dt.with_timezone(&chrono::Utc))
    }

    conduit_core::RateLimitInfo {
        request_id: header_str(headers, "request-id").map(String::from),
        organization_id: header_str(headers, "anthropic-organization-id").map(String::from),
        limit_requests: header_u64(headers, "ratelimit-limit-requests"),
        limit_tokens: header_u64(headers, "ratelimit-limit-tokens"),
        remaining_requests: header_u64(headers, "ratelimit-remaining-requests"),
        remaining_tokens: header_u64(headers, "ratelimit-remaining-tokens"),
        reset_requests: header_timestamp(headers, "ratelimit-reset-requests"),
        reset_tokens: header_timestamp(headers, "ratelimit-reset-tokens"),
        retry_after: header_str(headers, "retry-after").and_then(|v| v.parse().ok()),
    }
}

/// Executes `body` as a JSON request against `url`, retrying per §4.4 and
/// decoding the success body as `R`. `decode_error` turns a non-2xx body
/// into the backend's mapped `AIError` (each backend's own error schema).
pub async fn execute_json<B, R>(
    client: &Client,
    method: Method,
    url: &str,
    headers: HeaderMap,
    body: &B,
    timeout: Duration,
    policy: RetryPolicy,
    cancellation: Option<&CancellationToken>,
    decode_error: impl Fn(u16, &str, Option<f64>) -> AIError,
) -> Result<(R, conduit_core::RateLimitInfo), AIError>
where
    B: Serialize + Sync,
    R: DeserializeOwned,
{
    let body_bytes = serde_json::to_vec(body).map_err(|e| AIError::GenerationFailed(format!("request serialization failed: {e}")))?;

    retry_with_backoff(policy, cancellation, || {
        let client = client.clone();
        let headers = headers.clone();
        let body_bytes = body_bytes.clone();
        let decode_error = &decode_error;
        async move {
            let request: RequestBuilder = client
                .request(method.clone(), url)
                .headers(headers)
                .timeout(timeout)
                .body(body_bytes);

            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout(timeout)
                } else {
                    AIError::NetworkError(e.to_string())
                }
            })?;

            let status = response.status();
            let rate_limit_info = extract_rate_limit_info(response.headers());

            if status.is_success() {
                let text = response.text().await.map_err(|e| AIError::NetworkError(e.to_string()))?;
                let value: R = serde_json::from_str(&text)
                    .map_err(|e| AIError::GenerationFailed(format!("response decode failed: {e}")))?;
                return Ok((value, rate_limit_info));
            }

            let retry_after = rate_limit_info.retry_after;
            let text = response.text().await.unwrap_or_default();
            Err(decode_error(status.as_u16(), &text, retry_after))
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_known_headers_and_leaves_the_rest_none() {
        let mut headers = HeaderMap::new();
        headers.insert("request-id", "req_123".parse().unwrap());
        headers.insert("ratelimit-remaining-requests", "42".parse().unwrap());
        headers.insert("retry-after", "3.5".parse().unwrap());

        let info = extract_rate_limit_info(&headers);
        assert_eq!(info.request_id.as_deref(), Some("req_123"));
        assert_eq!(info.remaining_requests, Some(42));
        assert_eq!(info.retry_after, Some(3.5));
        assert_eq!(info.limit_tokens, None);
    }
}
