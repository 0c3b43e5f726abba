//! PvP API response types.

use serde::Deserialize;

/// Response of `.../pvp-summary`.
#[derive(Debug, Deserialize)]
pub struct PvpSummaryResponse {
    /// Honor level (required).
    pub honor_level: i64,
}

/// Response of `.../pvp-bracket/{bracket}`.
#[derive(Debug, Default, Deserialize)]
pub struct PvpBracketResponse {
    /// Current rating.
    #[serde(default)]
    pub rating: Option<i64>,
    /// Season match statistics.
    #[serde(default)]
    pub season_match_statistics: Option<MatchStatistics>,
}

/// Played/won/lost counters.
#[derive(Debug, Default, Deserialize)]
pub struct MatchStatistics {
    /// Matches won.
    #[serde(default)]
    pub won: i64,
}
