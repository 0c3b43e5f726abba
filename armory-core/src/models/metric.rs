//! Metric record types.
//!
//! This module contains the normalized output consumed by the host:
//! - [`MetricRecord`] - One named value with unit and freshness metadata
//! - [`MetricValue`] - Typed metric value
//! - [`MetricUnit`] - Display unit
//! - [`Population`] - Realm population bucket
//! - [`ErrorKind`] - Why a record is stale

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Metric Value
// ============================================================================

/// A typed metric value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    /// Whole number (levels, ratings, counts).
    Integer(i64),
    /// Free text (guild name, class, status).
    Text(String),
    /// Boolean flag.
    Flag(bool),
    /// Realm population bucket.
    Population(Population),
    /// Point in time.
    Timestamp(DateTime<Utc>),
}

impl MetricValue {
    /// Returns the integer value, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the flag value, if this is a flag.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Flag(v) => write!(f, "{v}"),
            Self::Population(p) => write!(f, "{p}"),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

// ============================================================================
// Population
// ============================================================================

/// Realm population bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Population {
    /// Low population.
    Low,
    /// Medium population.
    Medium,
    /// High population.
    High,
    /// Full (may queue).
    Full,
}

impl Population {
    /// Maps an API population type to a bucket.
    ///
    /// New and recommended realms count as low; locked realms count as full.
    pub fn from_api(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LOW" | "NEW" | "RECOMMENDED" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "FULL" | "LOCKED" => Some(Self::Full),
            _ => None,
        }
    }

    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Full => "Full",
        }
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Metric Unit
// ============================================================================

/// Display unit of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    /// Character or honor level.
    Level,
    /// Equipped item level.
    ItemLevel,
    /// Achievement points.
    Points,
    /// Gold (copper / 10000).
    Gold,
    /// PvP rating.
    Rating,
    /// Wins.
    Wins,
    /// Bosses defeated.
    Bosses,
    /// Boss kills.
    Kills,
    /// Mythic+ score.
    Score,
    /// Mythic+ runs.
    Runs,
}

impl MetricUnit {
    /// Returns the short unit symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::ItemLevel => "ilvl",
            Self::Points => "points",
            Self::Gold => "gold",
            Self::Rating => "rating",
            Self::Wins => "wins",
            Self::Bosses => "bosses",
            Self::Kills => "kills",
            Self::Score => "score",
            Self::Runs => "runs",
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ============================================================================
// Error Kind
// ============================================================================

/// Classified reason a fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials rejected or token invalid.
    Auth,
    /// Quota exhausted after bounded retries.
    RateLimitExceeded,
    /// Entity does not exist at the API.
    NotFound,
    /// Unexpected payload shape.
    Schema,
    /// Network failure or server error after bounded retries.
    Unavailable,
    /// Invalid configuration.
    Config,
}

impl ErrorKind {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auth => "Authentication failed",
            Self::RateLimitExceeded => "Rate limit exceeded",
            Self::NotFound => "Not found",
            Self::Schema => "Unexpected response",
            Self::Unavailable => "Unavailable",
            Self::Config => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Metric Record
// ============================================================================

/// One normalized metric for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Metric name (e.g. `item_level`).
    pub key: String,
    /// Metric value.
    pub value: MetricValue,
    /// Unit, if the value has one.
    pub unit: Option<MetricUnit>,
    /// Key of the entity this metric belongs to.
    pub entity: String,
    /// When the value was fetched.
    pub fetched_at: DateTime<Utc>,
    /// True when the value is carried over from an earlier successful fetch.
    #[serde(default)]
    pub stale: bool,
    /// Why the latest fetch failed, if it did.
    #[serde(default)]
    pub error: Option<ErrorKind>,
}

impl MetricRecord {
    /// Creates a fresh record.
    pub fn new(
        key: impl Into<String>,
        value: MetricValue,
        unit: Option<MetricUnit>,
        entity: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            unit,
            entity: entity.into(),
            fetched_at,
            stale: false,
            error: None,
        }
    }

    /// Flags this record as carried over after a failed fetch.
    ///
    /// `fetched_at` keeps the time of the last successful fetch.
    pub fn mark_stale(&mut self, error: ErrorKind) {
        self.stale = true;
        self.error = Some(error);
    }

    /// Returns true if the value is fresh.
    pub fn is_fresh(&self) -> bool {
        !self.stale && self.error.is_none()
    }
}

// ============================================================================
// Tests
// ============================================================================
