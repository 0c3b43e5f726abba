//! Snapshot types.
//!
//! The snapshot is the latest committed state of every metric, keyed by
//! entity and tier. It is only ever changed one whole tier at a time through
//! [`Snapshot::apply_tier`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::entity::TrackedEntity;
use super::metric::{ErrorKind, MetricRecord};
use super::tier::FetchTier;

// ============================================================================
// Tier Snapshot
// ============================================================================

/// Committed records of one tier for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSnapshot {
    /// Metric records (possibly stale).
    pub records: Vec<MetricRecord>,
    /// True when the latest fetch failed.
    pub stale: bool,
    /// Why the latest fetch failed.
    pub error: Option<ErrorKind>,
    /// Time of the last successful fetch.
    pub last_success: Option<DateTime<Utc>>,
    /// Time of the last attempt, successful or not.
    pub last_attempt: DateTime<Utc>,
}

impl TierSnapshot {
    /// Creates a tier snapshot from freshly normalized records.
    pub fn fresh(records: Vec<MetricRecord>, at: DateTime<Utc>) -> Self {
        Self {
            records,
            stale: false,
            error: None,
            last_success: Some(at),
            last_attempt: at,
        }
    }

    /// Creates an empty tier snapshot flagged with an error ("no data yet").
    pub fn missing(error: ErrorKind, at: DateTime<Utc>) -> Self {
        Self {
            records: Vec::new(),
            stale: true,
            error: Some(error),
            last_success: None,
            last_attempt: at,
        }
    }

    /// Keeps the existing records but flags them stale.
    pub fn mark_failed(&mut self, error: ErrorKind, at: DateTime<Utc>) {
        self.stale = true;
        self.error = Some(error);
        self.last_attempt = at;
        for record in &mut self.records {
            record.mark_stale(error);
        }
    }

    /// Returns true if a successful fetch has ever been committed.
    pub fn has_data(&self) -> bool {
        self.last_success.is_some()
    }

    /// Looks up a record by metric key.
    pub fn metric(&self, key: &str) -> Option<&MetricRecord> {
        self.records.iter().find(|r| r.key == key)
    }
}

// ============================================================================
// Entity Update
// ============================================================================

/// Result of one entity's fetch within a tier cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityUpdate {
    /// Fetch succeeded; these records replace the previous ones.
    Fresh(Vec<MetricRecord>),
    /// Fetch failed; previous records are kept and flagged stale.
    Failed(ErrorKind),
}

// ============================================================================
// Cycle Outcome
// ============================================================================

/// Outcome of one tier cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Every entity fetched successfully (or there was nothing to fetch).
    Success,
    /// Some entities succeeded, some failed.
    PartialFailure,
    /// Every entity failed.
    Failure,
}

impl CycleOutcome {
    /// Classifies a cycle from its success and failure counts.
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => Self::Success,
            (0, _) => Self::Failure,
            _ => Self::PartialFailure,
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::PartialFailure => "partial failure",
            Self::Failure => "failure",
        };
        write!(f, "{label}")
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Latest committed metrics of every tracked entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entities: HashMap<TrackedEntity, HashMap<FetchTier, TierSnapshot>>,
    version: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit counter, bumped by every [`apply_tier`](Self::apply_tier).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Time of the latest commit.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns true if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities that have at least one committed tier.
    pub fn entities(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entities.keys()
    }

    /// All committed tiers of an entity.
    pub fn entity(&self, entity: &TrackedEntity) -> Option<&HashMap<FetchTier, TierSnapshot>> {
        self.entities.get(entity)
    }

    /// Committed state of one tier for one entity.
    pub fn tier(&self, entity: &TrackedEntity, tier: FetchTier) -> Option<&TierSnapshot> {
        self.entities.get(entity).and_then(|tiers| tiers.get(&tier))
    }

    /// Looks up one metric.
    pub fn metric(
        &self,
        entity: &TrackedEntity,
        tier: FetchTier,
        key: &str,
    ) -> Option<&MetricRecord> {
        self.tier(entity, tier).and_then(|t| t.metric(key))
    }

    /// Flattens every tier of an entity into a metric-name map.
    pub fn metrics_for(&self, entity: &TrackedEntity) -> BTreeMap<&str, &MetricRecord> {
        self.entities
            .get(entity)
            .into_iter()
            .flat_map(|tiers| tiers.values())
            .flat_map(|t| t.records.iter())
            .map(|r| (r.key.as_str(), r))
            .collect()
    }

    /// Applies the results of one tier cycle.
    ///
    /// Fresh results replace the entity's records for that tier. Failed
    /// results keep whatever was there (or record its absence) and mark it
    /// stale. Other tiers are untouched.
    pub fn apply_tier(
        &mut self,
        tier: FetchTier,
        updates: Vec<(TrackedEntity, EntityUpdate)>,
        at: DateTime<Utc>,
    ) {
        for (entity, update) in updates {
            let tiers = self.entities.entry(entity).or_default();
            match update {
                EntityUpdate::Fresh(records) => {
                    tiers.insert(tier, TierSnapshot::fresh(records, at));
                }
                EntityUpdate::Failed(error) => match tiers.get_mut(&tier) {
                    Some(existing) => existing.mark_failed(error, at),
                    None => {
                        tiers.insert(tier, TierSnapshot::missing(error, at));
                    }
                },
            }
        }
        self.version += 1;
        self.updated_at = Some(at);
    }

    /// Drops entities for which `keep` returns false.
    ///
    /// Returns the number of entities removed.
    pub fn retain_entities<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&TrackedEntity) -> bool,
    {
        let before = self.entities.len();
        self.entities.retain(|entity, _| keep(entity));
        let removed = before - self.entities.len();
        if removed > 0 {
            self.version += 1;
        }
        removed
    }

    /// Drops tier entries for which `keep` returns false, then any entity
    /// left without tiers.
    ///
    /// Returns the number of tier entries removed.
    pub fn retain_tiers<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(FetchTier) -> bool,
    {
        let mut removed = 0;
        for tiers in self.entities.values_mut() {
            let before = tiers.len();
            tiers.retain(|tier, _| keep(*tier));
            removed += before - tiers.len();
        }
        self.entities.retain(|_, tiers| !tiers.is_empty());

        if removed > 0 {
            self.version += 1;
        }
        removed
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MetricUnit, MetricValue, Region};

    fn thrall() -> TrackedEntity {
        TrackedEntity::character("Thrall", "stormrage", Region::Us)
    }

    fn level_record(level: i64, at: DateTime<Utc>) -> MetricRecord {
        MetricRecord::new(
            "level",
            MetricValue::Integer(level),
            Some(MetricUnit::Level),
            thrall().key(),
            at,
        )
    }

    #[test]
    fn test_fresh_commit() {
        let mut snapshot = Snapshot::new();
        let at = Utc::now();
        snapshot.apply_tier(
            FetchTier::Basic,
            vec![(thrall(), EntityUpdate::Fresh(vec![level_record(70, at)]))],
            at,
        );

        let record = snapshot.metric(&thrall(), FetchTier::Basic, "level").unwrap();
        assert_eq!(record.value, MetricValue::Integer(70));
        assert!(!record.stale);
        assert_eq!(snapshot.version(), 1);
    }

    #[test]
    fn test_failure_retains_previous_value() {
        let mut snapshot = Snapshot::new();
        let first = Utc::now();
        snapshot.apply_tier(
            FetchTier::Basic,
            vec![(thrall(), EntityUpdate::Fresh(vec![level_record(70, first)]))],
            first,
        );

        let second = first + chrono::Duration::minutes(5);
        snapshot.apply_tier(
            FetchTier::Basic,
            vec![(thrall(), EntityUpdate::Failed(ErrorKind::NotFound))],
            second,
        );

        let tier = snapshot.tier(&thrall(), FetchTier::Basic).unwrap();
        assert!(tier.stale);
        assert_eq!(tier.error, Some(ErrorKind::NotFound));
        assert_eq!(tier.last_success, Some(first));
        assert_eq!(tier.last_attempt, second);

        let record = tier.metric("level").unwrap();
        assert_eq!(record.value, MetricValue::Integer(70));
        assert!(record.stale);
        assert_eq!(record.fetched_at, first);
    }

    #[test]
    fn test_failure_without_previous_value_records_absence() {
        let mut snapshot = Snapshot::new();
        let at = Utc::now();
        snapshot.apply_tier(
            FetchTier::PvP,
            vec![(thrall(), EntityUpdate::Failed(ErrorKind::Unavailable))],
            at,
        );

        let tier = snapshot.tier(&thrall(), FetchTier::PvP).unwrap();
        assert!(tier.records.is_empty());
        assert!(tier.stale);
        assert!(!tier.has_data());
    }

    #[test]
    fn test_other_tiers_untouched() {
        let mut snapshot = Snapshot::new();
        let at = Utc::now();
        snapshot.apply_tier(
            FetchTier::Basic,
            vec![(thrall(), EntityUpdate::Fresh(vec![level_record(70, at)]))],
            at,
        );
        snapshot.apply_tier(
            FetchTier::PvP,
            vec![(thrall(), EntityUpdate::Failed(ErrorKind::Unavailable))],
            at,
        );

        let basic = snapshot.tier(&thrall(), FetchTier::Basic).unwrap();
        assert!(!basic.stale);
    }

    #[test]
    fn test_retain_entities() {
        let mut snapshot = Snapshot::new();
        let at = Utc::now();
        let realm = TrackedEntity::realm("stormrage", Region::Us);
        snapshot.apply_tier(
            FetchTier::Basic,
            vec![(thrall(), EntityUpdate::Fresh(vec![level_record(70, at)]))],
            at,
        );
        snapshot.apply_tier(
            FetchTier::ServerStatus,
            vec![(realm.clone(), EntityUpdate::Fresh(vec![]))],
            at,
        );

        let removed = snapshot.retain_entities(|e| e.is_character());
        assert_eq!(removed, 1);
        assert!(snapshot.entity(&realm).is_none());
        assert!(snapshot.entity(&thrall()).is_some());
    }

    #[test]
    fn test_retain_tiers() {
        let mut snapshot = Snapshot::new();
        let at = Utc::now();
        let realm = TrackedEntity::realm("stormrage", Region::Us);
        snapshot.apply_tier(
            FetchTier::Basic,
            vec![(thrall(), EntityUpdate::Fresh(vec![level_record(70, at)]))],
            at,
        );
        snapshot.apply_tier(FetchTier::PvP, vec![(thrall(), EntityUpdate::Failed(ErrorKind::NotFound))], at);
        snapshot.apply_tier(
            FetchTier::ServerStatus,
            vec![(realm.clone(), EntityUpdate::Fresh(vec![]))],
            at,
        );
        let version = snapshot.version();

        assert_eq!(snapshot.retain_tiers(|_| true), 0);
        assert_eq!(snapshot.version(), version);

        let removed = snapshot.retain_tiers(|t| t != FetchTier::PvP && t != FetchTier::ServerStatus);
        assert_eq!(removed, 2);
        assert_eq!(snapshot.version(), version + 1);
        assert!(snapshot.tier(&thrall(), FetchTier::PvP).is_none());
        assert!(snapshot.tier(&thrall(), FetchTier::Basic).is_some());
        assert!(snapshot.entity(&realm).is_none());
    }

    #[test]
    fn test_cycle_outcome_from_counts() {
        assert_eq!(CycleOutcome::from_counts(3, 0), CycleOutcome::Success);
        assert_eq!(CycleOutcome::from_counts(0, 0), CycleOutcome::Success);
        assert_eq!(CycleOutcome::from_counts(2, 1), CycleOutcome::PartialFailure);
        assert_eq!(CycleOutcome::from_counts(0, 2), CycleOutcome::Failure);
    }
}
