//! Tracked entity types.
//!
//! A tracked entity is either a character or a realm. Entities are immutable
//! once created; the host replaces the whole list on reconfiguration.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::region::Region;
use crate::error::CoreError;

// ============================================================================
// Tracked Entity
// ============================================================================

/// A character or realm being monitored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackedEntity {
    /// A player character.
    Character {
        /// Character name.
        name: String,
        /// Realm slug or display name.
        realm: String,
        /// Region the character lives in.
        region: Region,
    },
    /// A realm (server).
    Realm {
        /// Realm slug or display name.
        slug: String,
        /// Region the realm lives in.
        region: Region,
    },
}

impl TrackedEntity {
    /// Creates a character entity.
    pub fn character(name: impl Into<String>, realm: impl Into<String>, region: Region) -> Self {
        Self::Character {
            name: name.into(),
            realm: realm.into(),
            region,
        }
    }

    /// Creates a realm entity.
    pub fn realm(slug: impl Into<String>, region: Region) -> Self {
        Self::Realm {
            slug: slug.into(),
            region,
        }
    }

    /// Region this entity belongs to.
    pub fn region(&self) -> Region {
        match self {
            Self::Character { region, .. } | Self::Realm { region, .. } => *region,
        }
    }

    /// Returns true for character entities.
    pub fn is_character(&self) -> bool {
        matches!(self, Self::Character { .. })
    }

    /// Normalised realm slug (the character's home realm for characters).
    pub fn realm_slug(&self) -> String {
        match self {
            Self::Character { realm, .. } => slugify(realm),
            Self::Realm { slug, .. } => slugify(slug),
        }
    }

    /// Lowercased character name, `None` for realms.
    pub fn character_name(&self) -> Option<String> {
        match self {
            Self::Character { name, .. } => Some(name.trim().to_lowercase()),
            Self::Realm { .. } => None,
        }
    }

    /// The realm entity a character plays on.
    pub fn home_realm(&self) -> Option<TrackedEntity> {
        match self {
            Self::Character { region, .. } => Some(Self::realm(self.realm_slug(), *region)),
            Self::Realm { .. } => None,
        }
    }

    /// Base profile path for a character, e.g. `/profile/wow/character/stormrage/thrall`.
    pub fn profile_path(&self) -> Option<String> {
        self.character_name()
            .map(|name| format!("/profile/wow/character/{}/{}", self.realm_slug(), name))
    }

    /// Checks that names are non-empty after normalisation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] for a blank realm or character
    /// name.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.realm_slug().is_empty() || self.character_name().is_some_and(|n| n.is_empty()) {
            return Err(CoreError::InvalidConfig(format!("{self} has an empty name")));
        }
        Ok(())
    }

    /// Stable string key used in metric records and logs.
    pub fn key(&self) -> String {
        match self {
            Self::Character { region, .. } => format!(
                "character:{}:{}:{}",
                region.code(),
                self.realm_slug(),
                self.character_name().unwrap_or_default()
            ),
            Self::Realm { region, .. } => {
                format!("realm:{}:{}", region.code(), self.realm_slug())
            }
        }
    }
}

impl fmt::Display for TrackedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character { name, realm, region } => write!(f, "{name}-{realm} ({region})"),
            Self::Realm { slug, region } => write!(f, "{slug} ({region})"),
        }
    }
}

/// Normalises a realm name to its API slug.
///
/// `"Argent Dawn"` becomes `"argent-dawn"` and `"Kel'Thuzad"` becomes `"kelthuzad"`.
pub fn slugify(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
