//! Profile response parser.

use armory_fetch::FetchError;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::api::{CharacterProfile, EquipmentResponse};
use crate::resource::{NamedRef, decode};

/// Copper per gold.
const COPPER_PER_GOLD: i64 = 10_000;

/// Parsed character profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSummary {
    /// Character level.
    pub level: i64,
    /// Equipped item level.
    pub item_level: Option<i64>,
    /// Achievement points.
    pub achievement_points: Option<i64>,
    /// Whole gold.
    pub gold: Option<i64>,
    /// Guild name.
    pub guild: Option<String>,
    /// Class name.
    pub character_class: Option<String>,
    /// Race name.
    pub race: Option<String>,
    /// Faction name.
    pub faction: Option<String>,
    /// Active specialization name.
    pub active_spec: Option<String>,
    /// Last login.
    pub last_login: Option<DateTime<Utc>>,
}

/// Parses a profile body and, optionally, the equipment body.
///
/// The profile's `equipped_item_level` wins; otherwise the item level is the
/// rounded mean of equipped items that have one.
///
/// # Errors
///
/// Returns [`FetchError::Schema`] if `level` is missing or either body is
/// malformed.
pub fn parse_profile(profile_json: &str, equipment_json: Option<&str>) -> Result<ProfileSummary, FetchError> {
    debug!(len = profile_json.len(), "Parsing character profile");
    let profile: CharacterProfile = decode(profile_json, "character profile")?;

    let item_level = match (profile.equipped_item_level, equipment_json) {
        (Some(ilvl), _) => Some(ilvl),
        (None, Some(body)) => {
            let equipment: EquipmentResponse = decode(body, "character equipment")?;
            average_item_level(&equipment)
        }
        (None, None) => None,
    };

    Ok(summarize(profile, item_level))
}

fn summarize(profile: CharacterProfile, item_level: Option<i64>) -> ProfileSummary {
    ProfileSummary {
        level: profile.level,
        item_level,
        achievement_points: profile.achievement_points,
        gold: profile.money.map(|copper| copper / COPPER_PER_GOLD),
        guild: name_of(profile.guild),
        character_class: name_of(profile.character_class),
        race: name_of(profile.race),
        faction: profile.faction.and_then(|f| f.name.or(f.kind)),
        active_spec: name_of(profile.active_spec),
        last_login: profile
            .last_login_timestamp
            .and_then(DateTime::from_timestamp_millis),
    }
}

/// Rounded mean item level of the equipped items that have one.
pub fn average_item_level(equipment: &EquipmentResponse) -> Option<i64> {
    let levels: Vec<i64> = equipment
        .equipped_items
        .iter()
        .filter_map(super::api::EquippedItem::item_level)
        .collect();

    if levels.is_empty() {
        return None;
    }

    let total: i64 = levels.iter().sum();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let mean = (total as f64 / levels.len() as f64).round() as i64;
    Some(mean)
}

fn name_of(named: Option<NamedRef>) -> Option<String> {
    named.and_then(|n| n.name).filter(|n| !n.is_empty())
}
