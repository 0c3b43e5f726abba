//! Fetch context shared by every resource fetcher.
//!
//! The context bundles the request executor, the token source behind it and
//! the settings fetchers need to shape their requests.

use std::sync::Arc;
use std::time::Duration;

use armory_core::Region;
use serde::{Deserialize, Serialize};

use crate::credentials::{ClientCredentials, CredentialManager, DEFAULT_REFRESH_MARGIN, TokenSource};
use crate::endpoints::EndpointTable;
use crate::error::FetchError;
use crate::executor::{RawResponse, RequestExecutor};
use crate::rate_limit::{Quota, RegionLimiters};
use crate::retry::RetryPolicy;

/// User agent string for Armory Watch.
const USER_AGENT: &str = concat!("ArmoryWatch/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for fetch operations.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Timeout of a single HTTP request.
    pub request_timeout: Duration,
    /// Timeout of one entity's fetch (all of its requests and retries).
    pub fetch_timeout: Duration,
    /// Maximum concurrent entity fetches per tier cycle.
    pub max_concurrency: usize,
    /// Retry budgets and backoff bounds.
    pub retry: RetryPolicy,
    /// How long before expiry a token is refreshed.
    pub refresh_margin: Duration,
    /// Quotas enforced per region.
    pub quotas: Vec<Quota>,
    /// Per-region endpoint overrides.
    pub endpoints: EndpointTable,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            max_concurrency: 4,
            retry: RetryPolicy::default(),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            quotas: Quota::api_defaults(),
            endpoints: EndpointTable::new(),
        }
    }
}

impl FetchSettings {
    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the per-fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the endpoint overrides.
    pub fn with_endpoints(mut self, endpoints: EndpointTable) -> Self {
        self.endpoints = endpoints;
        self
    }
}

// ============================================================================
// Game Settings
// ============================================================================

/// Game-specific defaults used to shape requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Expansion whose raids count as current progression.
    pub current_expansion: String,
    /// Mythic+ season used when the profile lists none.
    pub default_mythic_plus_season: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            current_expansion: "The War Within".to_string(),
            default_mythic_plus_season: 12,
        }
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Context provided to resource fetchers.
pub struct FetchContext {
    /// Rate-limited executor.
    pub executor: Arc<RequestExecutor>,
    /// Token source used by the executor.
    pub tokens: Arc<dyn TokenSource>,
    /// Fetch settings.
    pub settings: FetchSettings,
    /// Game settings.
    pub game: GameSettings,
}

impl FetchContext {
    /// Creates a context that authenticates with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if the credentials are blank or the
    /// HTTP client cannot be built.
    pub fn new(credentials: ClientCredentials, settings: FetchSettings) -> Result<Self, FetchError> {
        Self::builder().credentials(credentials).settings(settings).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// Issues a GET through the executor.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::execute`].
    pub async fn get(
        &self,
        region: Region,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<RawResponse, FetchError> {
        self.executor.execute(region, path, params).await
    }

    /// Returns the per-fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        self.settings.fetch_timeout
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("settings", &self.settings)
            .field("game", &self.game)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
#[derive(Default)]
pub struct FetchContextBuilder {
    credentials: Option<ClientCredentials>,
    tokens: Option<Arc<dyn TokenSource>>,
    http: Option<reqwest::Client>,
    settings: FetchSettings,
    game: GameSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client credentials used by the default credential manager.
    pub fn credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Replaces the credential manager with another token source.
    pub fn token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Sets the HTTP client.
    pub fn http(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the fetch settings.
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the game settings.
    pub fn game(mut self, game: GameSettings) -> Self {
        self.game = game;
        self
    }

    /// Builds the fetch context.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if neither credentials nor a token
    /// source were given, the credentials are blank, or the HTTP client
    /// cannot be built.
    pub fn build(self) -> Result<FetchContext, FetchError> {
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(self.settings.request_timeout)
                .user_agent(USER_AGENT)
                .build()
                .map_err(|e| FetchError::Config(format!("failed to create HTTP client: {e}")))?,
        };

        let tokens: Arc<dyn TokenSource> = match (self.tokens, self.credentials) {
            (Some(tokens), _) => tokens,
            (None, Some(credentials)) => {
                if credentials.is_blank() {
                    return Err(FetchError::Config(
                        "client id and secret must not be empty".to_string(),
                    ));
                }
                Arc::new(
                    CredentialManager::new(credentials, self.settings.endpoints.clone(), http.clone())
                        .with_refresh_margin(self.settings.refresh_margin)
                        .with_retry(self.settings.retry.clone()),
                )
            }
            (None, None) => {
                return Err(FetchError::Config("no credentials configured".to_string()));
            }
        };

        let executor = RequestExecutor::new(
            http,
            Arc::clone(&tokens),
            self.settings.endpoints.clone(),
            Arc::new(RegionLimiters::new(self.settings.quotas.clone())),
            self.settings.retry.clone(),
        );

        Ok(FetchContext {
            executor: Arc::new(executor),
            tokens,
            settings: self.settings,
            game: self.game,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
