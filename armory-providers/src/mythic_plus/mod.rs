//! Mythic+ season summary (MythicPlus tier).
//!
//! Requests `.../mythic-keystone-profile` for the season list and weekly
//! runs, then `.../mythic-keystone-profile/season/{id}` for the season's
//! best runs. A season 404 means no runs this season.

mod api;
mod fetcher;
pub(crate) mod parser;

pub use api::{KeystoneProfile, KeystoneRun, KeystoneSeason};
pub use fetcher::MythicPlusFetcher;
pub use parser::{MythicPlusSummary, current_season_id, parse_mythic_plus};
