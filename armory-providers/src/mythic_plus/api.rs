//! Mythic keystone API response types.

use serde::Deserialize;

/// Response of `.../mythic-keystone-profile`.
#[derive(Debug, Default, Deserialize)]
pub struct KeystoneProfile {
    /// Current weekly period.
    #[serde(default)]
    pub current_period: Option<CurrentPeriod>,
    /// Seasons the character has played.
    #[serde(default)]
    pub seasons: Vec<SeasonRef>,
    /// Overall rating of the current season.
    #[serde(default)]
    pub current_mythic_rating: Option<Rating>,
}

/// The current weekly period.
#[derive(Debug, Default, Deserialize)]
pub struct CurrentPeriod {
    /// Best runs this week.
    #[serde(default)]
    pub best_runs: Vec<KeystoneRun>,
}

/// Reference to a season.
#[derive(Debug, Deserialize)]
pub struct SeasonRef {
    /// Season id.
    pub id: u32,
}

/// A mythic rating.
#[derive(Debug, Deserialize)]
pub struct Rating {
    /// Rating value.
    pub rating: f64,
}

/// Response of `.../mythic-keystone-profile/season/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct KeystoneSeason {
    /// Best run per dungeon.
    #[serde(default)]
    pub best_runs: Vec<KeystoneRun>,
    /// Season rating.
    #[serde(default)]
    pub mythic_rating: Option<Rating>,
}

/// One keystone run.
#[derive(Debug, Deserialize)]
pub struct KeystoneRun {
    /// Keystone level.
    #[serde(default)]
    pub keystone_level: i64,
    /// Whether the run beat the timer.
    #[serde(default)]
    pub is_completed_within_time: bool,
}
