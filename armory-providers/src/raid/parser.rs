//! Raid response parser.

use armory_fetch::FetchError;
use tracing::debug;

use super::api::{EncountersResponse, ModeEntry};
use crate::resource::decode;

/// Raid difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    /// Raid Finder.
    Lfr,
    /// Normal.
    Normal,
    /// Heroic.
    Heroic,
    /// Mythic.
    Mythic,
}

impl Difficulty {
    /// Classifies a mode by its `difficulty.type`, falling back to the name.
    pub fn classify(kind: Option<&str>, name: Option<&str>) -> Option<Self> {
        if let Some(kind) = kind {
            match kind.to_ascii_uppercase().as_str() {
                "LFR" | "LOOKING_FOR_RAID" => return Some(Self::Lfr),
                "NORMAL" => return Some(Self::Normal),
                "HEROIC" => return Some(Self::Heroic),
                "MYTHIC" => return Some(Self::Mythic),
                _ => {}
            }
        }

        let name = name?.to_lowercase();
        if name.contains("raid finder") || name.contains("lfr") {
            Some(Self::Lfr)
        } else if name.contains("mythic") {
            Some(Self::Mythic)
        } else if name.contains("heroic") {
            Some(Self::Heroic)
        } else if name.contains("normal") {
            Some(Self::Normal)
        } else {
            None
        }
    }
}

/// Completed bosses per difficulty in the current expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaidProgress {
    /// Expansion the counts were taken from, if it was found.
    pub expansion: Option<String>,
    /// Raid Finder kills.
    pub lfr: i64,
    /// Normal kills.
    pub normal: i64,
    /// Heroic kills.
    pub heroic: i64,
    /// Mythic kills.
    pub mythic: i64,
    /// Kills over every mode, classified or not.
    pub total_kills: i64,
}

impl RaidProgress {
    /// Kills in one difficulty.
    pub fn kills(&self, difficulty: Difficulty) -> i64 {
        match difficulty {
            Difficulty::Lfr => self.lfr,
            Difficulty::Normal => self.normal,
            Difficulty::Heroic => self.heroic,
            Difficulty::Mythic => self.mythic,
        }
    }

    fn add(&mut self, mode: &ModeEntry) {
        let completed = mode.progress.completed_count;
        self.total_kills += completed;
        match Difficulty::classify(mode.difficulty.kind.as_deref(), mode.difficulty.name.as_deref()) {
            Some(Difficulty::Lfr) => self.lfr += completed,
            Some(Difficulty::Normal) => self.normal += completed,
            Some(Difficulty::Heroic) => self.heroic += completed,
            Some(Difficulty::Mythic) => self.mythic += completed,
            None => debug!(difficulty = ?mode.difficulty.name, "Unclassified raid difficulty"),
        }
    }
}

/// Parses the encounters body, counting only `expansion`'s instances.
///
/// The expansion is matched case-insensitively by name. A character with no
/// history in that expansion gets all-zero progress.
///
/// # Errors
///
/// Returns [`FetchError::Schema`] if `expansions` is missing.
pub fn parse_raid_progress(json: &str, expansion: &str) -> Result<RaidProgress, FetchError> {
    let response: EncountersResponse = decode(json, "raid encounters")?;

    let mut progress = RaidProgress::default();
    let current = response.expansions.iter().find(|entry| {
        entry
            .expansion
            .name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(expansion))
    });

    let Some(current) = current else {
        debug!(expansion, "No raid history in current expansion");
        return Ok(progress);
    };

    progress.expansion = current.expansion.name.clone();
    for instance in &current.instances {
        for mode in &instance.modes {
            progress.add(mode);
        }
    }

    Ok(progress)
}
