//! PvP ratings (PvP tier).
//!
//! Requests `.../pvp-summary` and one `.../pvp-bracket/{bracket}` per rated
//! bracket. A bracket 404 means the character is unrated there.

mod api;
mod fetcher;
pub(crate) mod parser;

pub use api::{PvpBracketResponse, PvpSummaryResponse};
pub use fetcher::PvpFetcher;
pub use parser::{BracketRating, PvpBracket, PvpSummary, parse_bracket, parse_pvp_summary};
