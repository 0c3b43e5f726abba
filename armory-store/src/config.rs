//! Tracker configuration.
//!
//! The host owns file I/O; this module only defines the serde shape, its
//! defaults and validation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use armory_core::{FetchTier, Region, RegionEndpoints, TrackedEntity};
use armory_fetch::{ClientCredentials, EndpointTable, FetchSettings, GameSettings, Quota, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::logging::LogLevel;

// ============================================================================
// Tracker Config
// ============================================================================

/// Configuration delivered by the host, replaced wholesale on update.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Account region.
    #[serde(default = "default_region")]
    pub region: Region,
    /// OAuth client id.
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Tiers to poll.
    #[serde(default = "default_enabled_tiers")]
    pub enabled_tiers: BTreeSet<FetchTier>,
    /// Characters and realms to poll.
    #[serde(default)]
    pub tracked_entities: Vec<TrackedEntity>,
    /// Per-tier interval overrides.
    #[serde(default)]
    pub intervals: TierIntervals,
    /// Request, retry and quota settings.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Expansion and season defaults.
    #[serde(default)]
    pub game: GameSettings,
    /// Acquire a token once before the first cycle and fail fast on bad
    /// credentials.
    #[serde(default)]
    pub verify_on_start: bool,
    /// Log level for [`crate::logging::init_logging`].
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_region() -> Region {
    Region::Us
}

fn default_enabled_tiers() -> BTreeSet<FetchTier> {
    FetchTier::all().iter().copied().collect()
}

impl TrackerConfig {
    /// Creates a config with every tier enabled and no entities.
    pub fn new(region: Region, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            region,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            enabled_tiers: default_enabled_tiers(),
            tracked_entities: Vec::new(),
            intervals: TierIntervals::default(),
            fetch: FetchConfig::default(),
            game: GameSettings::default(),
            verify_on_start: false,
            log_level: LogLevel::default(),
        }
    }

    /// Adds a tracked entity.
    pub fn with_entity(mut self, entity: TrackedEntity) -> Self {
        self.tracked_entities.push(entity);
        self
    }

    /// Replaces the enabled tiers.
    pub fn with_tiers(mut self, tiers: impl IntoIterator<Item = FetchTier>) -> Self {
        self.enabled_tiers = tiers.into_iter().collect();
        self
    }

    /// Returns true if `tier` is polled.
    pub fn is_enabled(&self, tier: FetchTier) -> bool {
        self.enabled_tiers.contains(&tier)
    }

    /// Client credentials.
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(self.client_id.clone(), self.client_secret.clone())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for blank credentials, entities outside
    /// the configured region, blank names, zero intervals, zero timeouts or
    /// a zero concurrency cap.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.credentials().is_blank() {
            return Err(StoreError::Config("client id and secret must not be empty".to_string()));
        }

        for entity in &self.tracked_entities {
            if entity.region() != self.region {
                return Err(StoreError::Config(format!(
                    "{entity} is not in the configured region {}",
                    self.region
                )));
            }
            entity.validate()?;
        }

        for tier in FetchTier::all() {
            if self.intervals.interval(*tier).is_zero() {
                return Err(StoreError::Config(format!("{tier} interval must be positive")));
            }
        }

        if self.fetch.request_timeout_secs == 0 || self.fetch.fetch_timeout_secs == 0 {
            return Err(StoreError::Config("request and fetch timeouts must be positive".to_string()));
        }

        if self.fetch.max_concurrency == 0 {
            return Err(StoreError::Config("max_concurrency must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Configured entities plus the home realm of every character.
    ///
    /// Order follows the configuration; implied realms come after the
    /// entity that implied them and are never duplicated.
    pub fn effective_entities(&self) -> Vec<TrackedEntity> {
        let mut seen = BTreeSet::new();
        let mut entities = Vec::with_capacity(self.tracked_entities.len() * 2);

        let mut push = |entity: TrackedEntity, entities: &mut Vec<TrackedEntity>| {
            if seen.insert(entity.key()) {
                entities.push(entity);
            }
        };

        for entity in &self.tracked_entities {
            push(entity.clone(), &mut entities);
            if let Some(realm) = entity.home_realm() {
                push(realm, &mut entities);
            }
        }
        entities
    }

    /// Fetch settings derived from this config.
    pub fn fetch_settings(&self) -> FetchSettings {
        self.fetch.to_settings()
    }

    /// Returns true if switching to `other` needs a fresh fetch context
    /// (credential cache and limiters).
    pub fn needs_new_context(&self, other: &TrackerConfig) -> bool {
        self.region != other.region
            || self.client_id != other.client_id
            || self.client_secret != other.client_secret
            || self.fetch != other.fetch
            || self.game != other.game
    }
}

impl std::fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("region", &self.region)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("enabled_tiers", &self.enabled_tiers)
            .field("tracked_entities", &self.tracked_entities)
            .field("intervals", &self.intervals)
            .field("fetch", &self.fetch)
            .field("game", &self.game)
            .field("verify_on_start", &self.verify_on_start)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tier Intervals
// ============================================================================

/// Per-tier polling interval overrides, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierIntervals(BTreeMap<FetchTier, u64>);

impl TierIntervals {
    /// Overrides one tier's interval.
    pub fn with(mut self, tier: FetchTier, interval: Duration) -> Self {
        self.0.insert(tier, interval.as_secs());
        self
    }

    /// Interval of a tier, falling back to its default.
    pub fn interval(&self, tier: FetchTier) -> Duration {
        self.0
            .get(&tier)
            .map_or_else(|| tier.default_interval(), |secs| Duration::from_secs(*secs))
    }
}

// ============================================================================
// Fetch Config
// ============================================================================

/// Request, retry and quota settings in config-file units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout of a single HTTP request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout of one entity's fetch, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Concurrent entity fetches per tier cycle.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Retries after HTTP 429.
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,
    /// Retries after network errors and 5xx.
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,
    /// First backoff delay, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff ceiling, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Token refresh margin, in seconds.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
    /// Requests allowed per second and region.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Requests allowed per hour and region.
    #[serde(default = "default_requests_per_hour")]
    pub requests_per_hour: u32,
    /// Endpoint overrides (proxies, test servers).
    #[serde(default)]
    pub endpoints: HashMap<Region, RegionEndpoints>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrency() -> usize {
    4
}

fn default_rate_limit_retries() -> u32 {
    3
}

fn default_transient_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_refresh_margin_secs() -> u64 {
    60
}

fn default_requests_per_second() -> u32 {
    100
}

fn default_requests_per_hour() -> u32 {
    36_000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout_secs(),
            fetch_timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            rate_limit_retries: default_rate_limit_retries(),
            transient_retries: default_transient_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            refresh_margin_secs: default_refresh_margin_secs(),
            requests_per_second: default_requests_per_second(),
            requests_per_hour: default_requests_per_hour(),
            endpoints: HashMap::new(),
        }
    }
}

impl FetchConfig {
    /// Points one region at other endpoints.
    pub fn with_endpoint(mut self, region: Region, endpoints: RegionEndpoints) -> Self {
        self.endpoints.insert(region, endpoints);
        self
    }

    /// Converts to runtime fetch settings.
    pub fn to_settings(&self) -> FetchSettings {
        let endpoints = self
            .endpoints
            .iter()
            .fold(EndpointTable::new(), |table, (region, endpoints)| {
                table.with_override(*region, endpoints.clone())
            });

        let retry = RetryPolicy::new(self.rate_limit_retries)
            .with_transient_retries(self.transient_retries)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms));

        FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_concurrency: self.max_concurrency,
            retry,
            refresh_margin: Duration::from_secs(self.refresh_margin_secs),
            quotas: vec![
                Quota::per_second(self.requests_per_second),
                Quota::per_hour(self.requests_per_hour),
            ],
            endpoints,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
