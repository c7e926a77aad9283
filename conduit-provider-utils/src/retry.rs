//! Exponential backoff retry, grounded in the teacher's
//! `generate_text::retries::retry_with_exponential_backoff_respecting_retry_headers`,
//! generalized to retry any fallible async operation against `AIError`'s
//! `is_retryable` classification and an optional provider-supplied
//! `Retry-After` delay.

use conduit_core::AIError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry policy: a cap on attempts plus the initial backoff delay. Doubled on
/// every retry, same as the teacher's loop.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, initial_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, ..Default::default() }
    }
}

/// Runs `operation` up to `policy.max_retries` additional times while its
/// error is [`AIError::is_retryable`], backing off exponentially and honoring
/// a rate limiter's `retry_after` hint when one is present. Returns
/// immediately, without retrying, on a non-retryable error or on
/// cancellation.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    cancellation: Option<&CancellationToken>,
    mut operation: F,
) -> Result<T, AIError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AIError>>,
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        if let Some(token) = cancellation {
            if token.is_cancelled() {
                return Err(AIError::Cancelled);
            }
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries || !err.is_retryable() {
                    return Err(err);
                }

                let wait = match &err {
                    AIError::RateLimited { retry_after: Some(seconds) } => {
                        Duration::from_secs_f64((*seconds).max(0.0))
                    }
                    _ => delay,
                };

                if let Some(token) = cancellation {
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = token.cancelled() => return Err(AIError::Cancelled),
                    }
                } else {
                    tokio::time::sleep(wait).await;
                }

                delay *= 2;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(RetryPolicy::new(2), None, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AIError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_retryable_errors_up_to_the_cap() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            RetryPolicy { max_retries: 2, initial_delay: Duration::from_millis(1) },
            None,
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(AIError::NetworkError("reset".into()))
                } else {
                    Ok(n)
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(RetryPolicy::new(5), None, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AIError::InvalidInput("bad request".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_short_circuits_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(RetryPolicy::new(3), Some(&token), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AIError>(())
        })
        .await;
        assert!(matches!(result, Err(AIError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
