//! Rate-limited request execution.
//!
//! [`RequestExecutor::execute`] takes a limiter slot for the region, attaches
//! the bearer token and locale, and applies the status policy:
//!
//! | Status | Handling |
//! |--------|----------|
//! | 2xx | returned as [`RawResponse`] |
//! | 429 | `Retry-After` or jittered backoff, bounded retries, then `RateLimitExceeded` |
//! | 401/403 | token invalidated, one retry with a fresh token, then `Auth` |
//! | 404 | `NotFound`, no retry |
//! | 5xx, timeout, connect error | bounded retries with backoff, then `Unavailable` |
//! | anything else | `Unavailable`, no retry |

use std::sync::Arc;
use std::time::Duration;

use armory_core::Region;
use reqwest::{StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::credentials::TokenSource;
use crate::endpoints::EndpointTable;
use crate::error::FetchError;
use crate::rate_limit::RegionLimiters;
use crate::retry::{RetryPolicy, parse_retry_after};

// ============================================================================
// Raw Response
// ============================================================================

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status.
    pub status: u16,
    /// Request URL (without query).
    pub url: String,
    /// Response body.
    pub body: String,
}

impl RawResponse {
    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Schema`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_str(&self.body)
            .map_err(|e| FetchError::Schema(format!("{}: {e}", self.url)))
    }
}

// ============================================================================
// Request Executor
// ============================================================================

/// Executes API requests under the shared per-region rate limiter.
pub struct RequestExecutor {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    endpoints: EndpointTable,
    limiters: Arc<RegionLimiters>,
    retry: RetryPolicy,
}

impl RequestExecutor {
    /// Creates an executor.
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        endpoints: EndpointTable,
        limiters: Arc<RegionLimiters>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            tokens,
            endpoints,
            limiters,
            retry,
        }
    }

    /// Token source used for bearer tokens.
    pub fn tokens(&self) -> &Arc<dyn TokenSource> {
        &self.tokens
    }

    /// Issues a GET for `path` against the region's API host.
    ///
    /// `locale` is added to `params` unless already present.
    ///
    /// # Errors
    ///
    /// See the module table. An auth failure from the token source is
    /// returned as-is without retry.
    #[instrument(skip(self, params), fields(region = %region, path = %path))]
    pub async fn execute(
        &self,
        region: Region,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<RawResponse, FetchError> {
        let endpoints = self.endpoints.resolve(region);
        let url = endpoints.api_url(path);

        let mut query: Vec<(&str, &str)> = params.to_vec();
        if !query.iter().any(|(k, _)| *k == "locale") {
            query.push(("locale", endpoints.locale.as_str()));
        }

        let mut rate_backoff = self.retry.backoff();
        let mut transient_backoff = self.retry.backoff();
        let mut auth_retried = false;

        loop {
            // Slot first: a token fetched before a long limiter wait may be
            // close to expiry by the time the request goes out.
            let waited = self.limiters.acquire(region).await;
            if !waited.is_zero() {
                debug!(waited_ms = waited.as_millis() as u64, "Waited for rate limiter");
            }

            let token = self.tokens.token(region).await?;

            let sent = self
                .http
                .get(&url)
                .bearer_auth(token.secret())
                .query(&query)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    let reason = describe_transport_error(&e);
                    self.transient_retry(&mut transient_backoff, &reason).await?;
                    continue;
                }
            };

            let status = response.status();
            debug!(status = %status, "Response received");

            if status.is_success() {
                match response.text().await {
                    Ok(body) => {
                        return Ok(RawResponse {
                            status: status.as_u16(),
                            url,
                            body,
                        });
                    }
                    Err(e) => {
                        let reason = format!("failed to read body: {e}");
                        self.transient_retry(&mut transient_backoff, &reason).await?;
                        continue;
                    }
                }
            }

            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after);

                    if rate_backoff.attempts() >= self.retry.rate_limit_retries {
                        warn!("Rate limit retries exhausted");
                        return Err(FetchError::RateLimitExceeded {
                            attempts: rate_backoff.attempts() + 1,
                        });
                    }

                    let delay = rate_backoff.next_delay(retry_after);
                    warn!(
                        attempt = rate_backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        retry_after_secs = retry_after.map(|d| d.as_secs()),
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    self.tokens.invalidate(region, token.secret()).await;
                    if auth_retried {
                        warn!(status = %status, "Token rejected after refresh");
                        return Err(FetchError::Auth(format!("{status} from {url}")));
                    }
                    debug!(status = %status, "Token rejected, retrying with a fresh token");
                    auth_retried = true;
                }
                StatusCode::NOT_FOUND => {
                    return Err(FetchError::NotFound(url));
                }
                s if s.is_server_error() => {
                    let reason = format!("{s} from {url}");
                    self.transient_retry(&mut transient_backoff, &reason).await?;
                }
                s => {
                    warn!(status = %s, "Unexpected status");
                    return Err(FetchError::Unavailable(format!("unexpected {s} from {url}")));
                }
            }
        }
    }

    /// Sleeps before the next transient retry, or fails if the budget is spent.
    async fn transient_retry(
        &self,
        backoff: &mut crate::retry::Backoff<'_>,
        reason: &str,
    ) -> Result<(), FetchError> {
        if backoff.attempts() >= self.retry.transient_retries {
            warn!(error = %reason, "Transient retries exhausted");
            return Err(FetchError::Unavailable(reason.to_string()));
        }

        let delay: Duration = backoff.next_delay(None);
        warn!(
            error = %reason,
            attempt = backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("endpoints", &self.endpoints)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    }
}

// ============================================================================
// Tests
// ============================================================================
