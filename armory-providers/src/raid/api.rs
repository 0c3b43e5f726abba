//! Raid encounter API response types.

use serde::Deserialize;

use crate::resource::{NamedRef, TypedRef};

/// Response of `.../encounters/raids`.
#[derive(Debug, Deserialize)]
pub struct EncountersResponse {
    /// Expansions with raid history (required).
    pub expansions: Vec<ExpansionEntry>,
}

/// One expansion's raid history.
#[derive(Debug, Deserialize)]
pub struct ExpansionEntry {
    /// Expansion reference.
    #[serde(default)]
    pub expansion: NamedRef,
    /// Raid instances.
    #[serde(default)]
    pub instances: Vec<InstanceEntry>,
}

/// One raid instance.
#[derive(Debug, Deserialize)]
pub struct InstanceEntry {
    /// Instance reference.
    #[serde(default)]
    pub instance: NamedRef,
    /// Per-difficulty progress.
    #[serde(default)]
    pub modes: Vec<ModeEntry>,
}

/// Progress in one difficulty.
#[derive(Debug, Deserialize)]
pub struct ModeEntry {
    /// Difficulty reference.
    #[serde(default)]
    pub difficulty: TypedRef,
    /// Completed bosses.
    #[serde(default)]
    pub progress: ModeProgress,
}

/// Boss counters.
#[derive(Debug, Default, Deserialize)]
pub struct ModeProgress {
    /// Bosses killed at least once.
    #[serde(default)]
    pub completed_count: i64,
    /// Bosses in the instance.
    #[serde(default)]
    pub total_count: i64,
}
