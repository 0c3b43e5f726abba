//! PvP response parser.

use std::fmt;

use armory_fetch::FetchError;

use super::api::{PvpBracketResponse, PvpSummaryResponse};
use crate::resource::decode;

/// Rated PvP bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PvpBracket {
    /// 2v2 arena.
    Arena2v2,
    /// 3v3 arena.
    Arena3v3,
    /// Rated battlegrounds.
    Rbg,
}

impl PvpBracket {
    /// Path segment of the bracket endpoint.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Arena2v2 => "2v2",
            Self::Arena3v3 => "3v3",
            Self::Rbg => "rbg",
        }
    }

    /// Metric key of the bracket's rating.
    pub fn metric_key(&self) -> &'static str {
        match self {
            Self::Arena2v2 => "pvp_2v2_rating",
            Self::Arena3v3 => "pvp_3v3_rating",
            Self::Rbg => "pvp_rbg_rating",
        }
    }

    /// All brackets in metric order.
    pub fn all() -> &'static [PvpBracket] {
        &[Self::Arena2v2, Self::Arena3v3, Self::Rbg]
    }
}

impl fmt::Display for PvpBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// One bracket's standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketRating {
    /// Bracket.
    pub bracket: PvpBracket,
    /// Rating, `None` when unrated.
    pub rating: Option<i64>,
    /// Season wins.
    pub season_wins: i64,
}

impl BracketRating {
    /// An unrated bracket.
    pub fn unrated(bracket: PvpBracket) -> Self {
        Self {
            bracket,
            rating: None,
            season_wins: 0,
        }
    }
}

/// Parsed PvP standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvpSummary {
    /// Honor level.
    pub honor_level: i64,
    /// Per-bracket standing, in [`PvpBracket::all`] order.
    pub brackets: Vec<BracketRating>,
}

impl PvpSummary {
    /// Rating of one bracket, `None` when unrated.
    pub fn rating(&self, bracket: PvpBracket) -> Option<i64> {
        self.brackets
            .iter()
            .find(|b| b.bracket == bracket)
            .and_then(|b| b.rating)
    }

    /// Season wins summed over the rated brackets.
    ///
    /// A bracket body without a rating contributes nothing, even if it
    /// reports match statistics.
    pub fn season_wins(&self) -> i64 {
        self.brackets
            .iter()
            .filter(|b| b.rating.is_some())
            .map(|b| b.season_wins)
            .sum()
    }
}

/// Parses the PvP summary body.
///
/// # Errors
///
/// Returns [`FetchError::Schema`] if `honor_level` is missing.
pub fn parse_pvp_summary(json: &str) -> Result<i64, FetchError> {
    let summary: PvpSummaryResponse = decode(json, "pvp summary")?;
    Ok(summary.honor_level)
}

/// Parses one bracket body; `None` means the bracket was not found.
///
/// # Errors
///
/// Returns [`FetchError::Schema`] if the body is malformed.
pub fn parse_bracket(bracket: PvpBracket, json: Option<&str>) -> Result<BracketRating, FetchError> {
    let Some(json) = json else {
        return Ok(BracketRating::unrated(bracket));
    };

    let response: PvpBracketResponse = decode(json, "pvp bracket")?;
    Ok(BracketRating {
        bracket,
        rating: response.rating,
        season_wins: response.season_match_statistics.map_or(0, |s| s.won),
    })
}
