//! Character profile (Basic tier).
//!
//! Requests `/profile/wow/character/{realm}/{name}` and, when the profile
//! lacks `equipped_item_level`, the character's equipment.

mod api;
mod fetcher;
pub(crate) mod parser;

pub use api::{CharacterProfile, EquipmentResponse, EquippedItem};
pub use fetcher::ProfileFetcher;
pub use parser::{ProfileSummary, parse_profile};
