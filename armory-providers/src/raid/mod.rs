//! Raid progression (Raid tier).
//!
//! Requests `.../encounters/raids` and counts completed bosses per difficulty
//! across the current expansion's instances.

mod api;
mod fetcher;
pub(crate) mod parser;

pub use api::EncountersResponse;
pub use fetcher::RaidFetcher;
pub use parser::{Difficulty, RaidProgress, parse_raid_progress};
