//! OAuth client-credentials token management.
//!
//! [`CredentialManager`] owns one cached access token per region. Refreshes
//! are single-flight: while a refresh for a region is running, every caller
//! awaits that same refresh and receives its result, success or error.
//!
//! ## Exchange
//!
//! `POST <oauth token url>` with HTTP Basic auth (`client_id:client_secret`)
//! and form body `grant_type=client_credentials`. The response carries
//! `access_token` and `expires_in` (seconds).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use armory_core::Region;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::endpoints::EndpointTable;
use crate::error::FetchError;
use crate::retry::RetryPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Token lifetime assumed when the response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Default refresh margin before expiry.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

// ============================================================================
// Credential Types
// ============================================================================

/// API client id and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// OAuth client id.
    pub client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    /// Creates a credential pair.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// The client secret.
    pub fn secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns true if either half is blank.
    pub fn is_blank(&self) -> bool {
        self.client_id.trim().is_empty() || self.client_secret.trim().is_empty()
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A bearer token with its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a token.
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// The raw token value.
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// When the token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the token stays valid for at least `margin` past `now`.
    pub fn is_fresh(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::zero());
        now + margin < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

// ============================================================================
// Token Source Trait
// ============================================================================

/// Supplies bearer tokens per region.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a token that is valid for at least the refresh margin.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Auth`] if the credentials are rejected or the
    /// token endpoint stays unreachable.
    async fn token(&self, region: Region) -> Result<AccessToken, FetchError>;

    /// Drops the cached token if it is still `rejected`, so the next call
    /// refreshes.
    ///
    /// A rejection that arrives after another caller already refreshed
    /// leaves the newer token in place.
    async fn invalidate(&self, region: Region, rejected: &str);

    /// Performs one token acquisition to check the credentials.
    async fn verify(&self, region: Region) -> Result<(), FetchError> {
        self.token(region).await.map(|_| ())
    }
}

// ============================================================================
// Credential Manager
// ============================================================================

type SharedRefresh = Shared<BoxFuture<'static, Result<AccessToken, FetchError>>>;

#[derive(Default)]
struct RegionSlot {
    token: Option<AccessToken>,
    inflight: Option<SharedRefresh>,
}

/// Caches one access token per region and refreshes it single-flight.
pub struct CredentialManager {
    credentials: ClientCredentials,
    endpoints: EndpointTable,
    http: reqwest::Client,
    refresh_margin: Duration,
    retry: RetryPolicy,
    slots: Arc<Mutex<HashMap<Region, RegionSlot>>>,
}

impl CredentialManager {
    /// Creates a manager with the default refresh margin and retry policy.
    pub fn new(
        credentials: ClientCredentials,
        endpoints: EndpointTable,
        http: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            endpoints,
            http,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            retry: RetryPolicy::default(),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sets how long before expiry a token is refreshed.
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Sets the retry policy for the token endpoint.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the cached token for a region without refreshing.
    pub async fn cached(&self, region: Region) -> Option<AccessToken> {
        let slots = self.slots.lock().await;
        slots.get(&region).and_then(|s| s.token.clone())
    }

    fn start_refresh(&self, region: Region) -> SharedRefresh {
        let http = self.http.clone();
        let credentials = self.credentials.clone();
        let token_url = self.endpoints.resolve(region).oauth_token_url;
        let retry = self.retry.clone();
        let slots = Arc::clone(&self.slots);

        async move {
            let result = exchange(&http, &credentials, &token_url, &retry, region).await;

            let mut slots = slots.lock().await;
            let slot = slots.entry(region).or_default();
            slot.inflight = None;
            if let Ok(token) = &result {
                slot.token = Some(token.clone());
            }
            result
        }
        .boxed()
        .shared()
    }
}

#[async_trait]
impl TokenSource for CredentialManager {
    async fn token(&self, region: Region) -> Result<AccessToken, FetchError> {
        let refresh = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(region).or_default();

            if let Some(token) = &slot.token {
                if token.is_fresh(self.refresh_margin, Utc::now()) {
                    return Ok(token.clone());
                }
            }

            match &slot.inflight {
                Some(inflight) => {
                    debug!(region = %region, "Joining in-flight token refresh");
                    inflight.clone()
                }
                None => {
                    let refresh = self.start_refresh(region);
                    slot.inflight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    async fn invalidate(&self, region: Region, rejected: &str) {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(&region) else {
            return;
        };

        if slot.token.as_ref().is_some_and(|t| t.secret() == rejected) {
            slot.token = None;
            debug!(region = %region, "Cached token invalidated");
        } else {
            debug!(region = %region, "Rejected token already replaced");
        }
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("credentials", &self.credentials)
            .field("refresh_margin", &self.refresh_margin)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Token Exchange
// ============================================================================

/// Exchanges client credentials for an access token.
///
/// Transport errors and 5xx are retried per `retry.transient_retries`;
/// every failure surfaces as [`FetchError::Auth`].
#[instrument(skip(http, credentials, retry), fields(region = %region))]
async fn exchange(
    http: &reqwest::Client,
    credentials: &ClientCredentials,
    token_url: &str,
    retry: &RetryPolicy,
    region: Region,
) -> Result<AccessToken, FetchError> {
    let mut backoff = retry.backoff();

    loop {
        debug!("Requesting access token");
        let sent = http
            .post(token_url)
            .basic_auth(&credentials.client_id, Some(credentials.secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await;

        let transient = match sent {
            Ok(response) if response.status().is_server_error() => {
                format!("token endpoint returned {}", response.status())
            }
            Ok(response) => return parse_token_response(response).await,
            Err(e) => format!("token endpoint unreachable: {e}"),
        };

        if backoff.attempts() >= retry.transient_retries {
            warn!(error = %transient, "Token refresh failed");
            return Err(FetchError::Auth(transient));
        }

        let delay = backoff.next_delay(None);
        warn!(error = %transient, delay_ms = delay.as_millis() as u64, "Retrying token refresh");
        tokio::time::sleep(delay).await;
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<AccessToken, FetchError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Auth(format!("failed to read token response: {e}")))?;
    let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();

    if !status.is_success() {
        let reason = parsed
            .and_then(|p| p.error_description.or(p.error))
            .unwrap_or_else(|| status.to_string());
        warn!(status = %status, "Credentials rejected");
        return Err(FetchError::Auth(format!("credentials rejected: {reason}")));
    }

    let parsed = parsed.ok_or_else(|| FetchError::Auth("token response is not JSON".to_string()))?;
    if let Some(error) = parsed.error {
        return Err(FetchError::Auth(format!("credentials rejected: {error}")));
    }

    let access_token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FetchError::Auth("token response has no access_token".to_string()))?;
    let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    let expires_at = Utc::now() + chrono::Duration::seconds(expires_in);

    info!(expires_at = %expires_at, "Access token refreshed");
    Ok(AccessToken::new(access_token, expires_at))
}

// ============================================================================
// Tests
// ============================================================================
