//! Mythic+ response parser.

use armory_fetch::FetchError;

use super::api::{KeystoneProfile, KeystoneRun, KeystoneSeason};
use crate::resource::decode;

/// Approximate score of a timed run, per keystone level.
const TIMED_RUN_WEIGHT: i64 = 125;
/// Approximate score of an untimed run, per keystone level.
const UNTIMED_RUN_WEIGHT: i64 = 100;

/// Parsed Mythic+ season standing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MythicPlusSummary {
    /// Season the runs were taken from.
    pub season_id: u32,
    /// Mythic rating, rounded.
    pub score: i64,
    /// Highest keystone level completed this season.
    pub best_run: i64,
    /// Best runs recorded this season.
    pub runs_completed: i64,
    /// Best runs that beat the timer.
    pub runs_timed: i64,
    /// Highest keystone level completed this week.
    pub weekly_best: i64,
}

/// Picks the season to request: the highest listed, else `default`.
pub fn current_season_id(profile: &KeystoneProfile, default: u32) -> u32 {
    profile.seasons.iter().map(|s| s.id).max().unwrap_or(default)
}

/// Parses the keystone profile body and, optionally, the season body.
///
/// # Errors
///
/// Returns [`FetchError::Schema`] if either body is malformed.
pub fn parse_mythic_plus(
    profile_json: &str,
    season_json: Option<&str>,
    default_season: u32,
) -> Result<MythicPlusSummary, FetchError> {
    let profile: KeystoneProfile = decode(profile_json, "keystone profile")?;
    let season = season_json
        .map(|body| decode::<KeystoneSeason>(body, "keystone season"))
        .transpose()?;
    let season_id = current_season_id(&profile, default_season);
    Ok(summarize(&profile, season.as_ref(), season_id))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn summarize(
    profile: &KeystoneProfile,
    season: Option<&KeystoneSeason>,
    season_id: u32,
) -> MythicPlusSummary {
    let runs: &[KeystoneRun] = season.map_or(&[][..], |s| s.best_runs.as_slice());

    let rating = season
        .and_then(|s| s.mythic_rating.as_ref())
        .or(profile.current_mythic_rating.as_ref())
        .map(|r| r.rating.round() as i64);

    let weekly_runs = profile
        .current_period
        .as_ref()
        .map_or(&[][..], |p| p.best_runs.as_slice());

    MythicPlusSummary {
        season_id,
        score: rating.unwrap_or_else(|| approximate_score(runs)),
        best_run: highest_level(runs),
        runs_completed: runs.len() as i64,
        runs_timed: runs.iter().filter(|r| r.is_completed_within_time).count() as i64,
        weekly_best: highest_level(weekly_runs),
    }
}

/// Score estimate used when the API reports no rating.
pub fn approximate_score(runs: &[KeystoneRun]) -> i64 {
    runs.iter()
        .map(|run| {
            let weight = if run.is_completed_within_time {
                TIMED_RUN_WEIGHT
            } else {
                UNTIMED_RUN_WEIGHT
            };
            run.keystone_level * weight
        })
        .sum()
}

fn highest_level(runs: &[KeystoneRun]) -> i64 {
    runs.iter().map(|r| r.keystone_level).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "current_period": {"period": {"id": 980}, "best_runs": [
            {"keystone_level": 12, "is_completed_within_time": true},
            {"keystone_level": 14, "is_completed_within_time": false}
        ]},
        "seasons": [{"id": 11}, {"id": 13}, {"id": 12}]
    }"#;

    const SEASON: &str = r#"{
        "season": {"id": 13},
        "best_runs": [
            {"keystone_level": 15, "is_completed_within_time": true, "dungeon": {"name": "Ara-Kara"}},
            {"keystone_level": 16, "is_completed_within_time": false},
            {"keystone_level": 14, "is_completed_within_time": true}
        ]
    }"#;

    #[test]
    fn test_season_id_is_highest_listed() {
        let profile: KeystoneProfile = serde_json::from_str(PROFILE).unwrap();
        assert_eq!(current_season_id(&profile, 12), 13);
        assert_eq!(current_season_id(&KeystoneProfile::default(), 12), 12);
    }

    #[test]
    fn test_approximate_score_without_rating() {
        let summary = parse_mythic_plus(PROFILE, Some(SEASON), 12).unwrap();
        assert_eq!(summary.season_id, 13);
        assert_eq!(summary.score, 15 * 125 + 16 * 100 + 14 * 125);
        assert_eq!(summary.best_run, 16);
        assert_eq!(summary.runs_completed, 3);
        assert_eq!(summary.runs_timed, 2);
        assert_eq!(summary.weekly_best, 14);
    }

    #[test]
    fn test_season_rating_wins() {
        let season = r#"{"best_runs": [], "mythic_rating": {"rating": 2654.6}}"#;
        let profile = r#"{"current_mythic_rating": {"rating": 1000.0}}"#;
        let summary = parse_mythic_plus(profile, Some(season), 12).unwrap();
        assert_eq!(summary.score, 2655);
    }

    #[test]
    fn test_profile_rating_fallback() {
        let profile = r#"{"current_mythic_rating": {"rating": 1999.4}}"#;
        let summary = parse_mythic_plus(profile, None, 12).unwrap();
        assert_eq!(summary.score, 1999);
        assert_eq!(summary.runs_completed, 0);
    }

    #[test]
    fn test_no_runs_this_season() {
        let summary = parse_mythic_plus("{}", None, 12).unwrap();
        assert_eq!(summary, MythicPlusSummary { season_id: 12, ..Default::default() });
    }
}
