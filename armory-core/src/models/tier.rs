//! Fetch tiers.
//!
//! A tier is a category of data with its own polling cadence. Tiers are
//! independent of each other; each one is scheduled on its own timer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::entity::TrackedEntity;

/// A category of data polled at its own cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchTier {
    /// Character profile (level, item level, guild, ...).
    Basic,
    /// Arena and battleground ratings.
    #[serde(rename = "pvp")]
    PvP,
    /// Raid progression for the current expansion.
    Raid,
    /// Mythic+ season summary.
    MythicPlus,
    /// Realm status and population.
    ServerStatus,
}

impl FetchTier {
    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::PvP => "PvP",
            Self::Raid => "Raid",
            Self::MythicPlus => "Mythic+",
            Self::ServerStatus => "Server Status",
        }
    }

    /// Default polling interval.
    pub fn default_interval(&self) -> Duration {
        match self {
            Self::Basic | Self::Raid => Duration::from_secs(300),
            Self::PvP | Self::MythicPlus => Duration::from_secs(60),
            Self::ServerStatus => Duration::from_secs(900),
        }
    }

    /// Returns true if this tier is fetched for the given entity.
    ///
    /// Server status applies to realms only; every other tier applies to
    /// characters only.
    pub fn applies_to(&self, entity: &TrackedEntity) -> bool {
        match self {
            Self::ServerStatus => !entity.is_character(),
            _ => entity.is_character(),
        }
    }

    /// Returns all tiers.
    pub fn all() -> &'static [FetchTier] {
        &[
            Self::Basic,
            Self::PvP,
            Self::Raid,
            Self::MythicPlus,
            Self::ServerStatus,
        ]
    }
}

impl fmt::Display for FetchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
