//! HTTP retry helpers for transient errors.
//!
//! Every GET against the data service goes through [`send_json`], which
//! retries connection failures, timeouts, HTTP 429 and HTTP 5xx with
//! exponential backoff. Other 4xx statuses are permanent. A body that is
//! not valid JSON is not re-fetched: the views degrade it to an empty
//! state like any other failure.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&pairs), policy).await?;
//! ```

use std::time::Duration;

use crate::ClientError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): 500ms, 1s, 2s, ...
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << shift)
    }
}

/// Sends a request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// # Errors
///
/// Returns [`ClientError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body is not valid JSON.
pub async fn send_json<F>(build_request: F, policy: RetryPolicy) -> Result<serde_json::Value, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_inner(&build_request, policy).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview = if text.len() > BODY_PREVIEW_LEN {
            let mut end = BODY_PREVIEW_LEN;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &text[..end])
        } else {
            text.clone()
        };
        log::warn!(
            "JSON parse failed\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len(),
        );
        ClientError::Json(e)
    })
}

/// Core retry loop. Returns the first 2xx/3xx response.
async fn send_inner<F>(build_request: &F, policy: RetryPolicy) -> Result<reqwest::Response, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(ClientError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if is_retryable_status(status) && attempt < max_retries {
                    log::warn!("  HTTP {status} from {}", response.url());
                    attempt += 1;
                    continue;
                }

                if status.is_client_error() || status.is_server_error() {
                    return Err(ClientError::Status {
                        status: status.as_u16(),
                        url: response.url().to_string(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// 429 and 5xx are worth another attempt.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
    }

    #[test]
    fn no_retry_policy_has_zero_delay() {
        assert_eq!(RetryPolicy::none().backoff(5), Duration::ZERO);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(reqwest::StatusCode::OK));
    }
}
