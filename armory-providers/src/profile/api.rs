//! Profile API response types.

use serde::Deserialize;

use crate::resource::{NamedRef, TypedRef};

/// Response of `/profile/wow/character/{realm}/{name}`.
#[derive(Debug, Deserialize)]
pub struct CharacterProfile {
    /// Character level (required).
    pub level: i64,
    /// Equipped item level, when the API reports it.
    #[serde(default)]
    pub equipped_item_level: Option<i64>,
    /// Achievement points.
    #[serde(default)]
    pub achievement_points: Option<i64>,
    /// Money in copper.
    #[serde(default)]
    pub money: Option<i64>,
    /// Guild membership.
    #[serde(default)]
    pub guild: Option<NamedRef>,
    /// Playable class.
    #[serde(default)]
    pub character_class: Option<NamedRef>,
    /// Playable race.
    #[serde(default)]
    pub race: Option<NamedRef>,
    /// Faction.
    #[serde(default)]
    pub faction: Option<TypedRef>,
    /// Active specialization.
    #[serde(default)]
    pub active_spec: Option<NamedRef>,
    /// Last login, milliseconds since the epoch.
    #[serde(default)]
    pub last_login_timestamp: Option<i64>,
}

/// Response of `.../equipment`.
#[derive(Debug, Default, Deserialize)]
pub struct EquipmentResponse {
    /// Equipped items.
    #[serde(default)]
    pub equipped_items: Vec<EquippedItem>,
}

/// One equipped item.
#[derive(Debug, Deserialize)]
pub struct EquippedItem {
    /// `{ "value": 639 }` item level object.
    #[serde(default)]
    pub level: Option<ItemLevel>,
    /// Flat item level, used by older payloads.
    #[serde(default)]
    pub item_level: Option<i64>,
}

impl EquippedItem {
    /// Item level, if the item has one (tabards and shirts often don't).
    pub fn item_level(&self) -> Option<i64> {
        self.level.as_ref().map(|l| l.value).or(self.item_level)
    }
}

/// Item level object.
#[derive(Debug, Deserialize)]
pub struct ItemLevel {
    /// Numeric item level.
    pub value: i64,
}
