//! Snapshot store.
//!
//! Holds the working [`Snapshot`] and publishes an immutable copy after
//! every commit, so readers never see a half-applied tier.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use armory_core::{CycleOutcome, FetchTier, Snapshot};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Capacity of the event channel; slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 64;

/// Emitted whenever a tier commits an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEvent {
    /// Tier that committed.
    pub tier: FetchTier,
    /// Outcome of the cycle.
    pub outcome: CycleOutcome,
    /// Snapshot version after the commit.
    pub version: u64,
    /// Commit time.
    pub committed_at: DateTime<Utc>,
}

/// Latest-value snapshot with change notifications.
pub struct SnapshotStore {
    working: Mutex<Snapshot>,
    published: watch::Sender<Arc<Snapshot>>,
    events: broadcast::Sender<SnapshotEvent>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (published, _) = watch::channel(Arc::new(Snapshot::new()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            working: Mutex::new(Snapshot::new()),
            published,
            events,
        }
    }

    /// Latest committed snapshot. Never blocks on a running cycle.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.borrow().clone()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.published.subscribe()
    }

    /// Receiver of commit events.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotEvent> {
        self.events.subscribe()
    }

    /// Applies one tier commit.
    ///
    /// `apply` runs under the store lock and returns false to abandon the
    /// commit, in which case nothing is published. Returns the new version
    /// if the commit went through.
    pub fn commit<F>(&self, tier: FetchTier, outcome: CycleOutcome, at: DateTime<Utc>, apply: F) -> Option<u64>
    where
        F: FnOnce(&mut Snapshot) -> bool,
    {
        let version = {
            let mut working = self.lock();
            if !apply(&mut working) {
                return None;
            }
            let version = working.version();
            self.published.send_replace(Arc::new(working.clone()));
            version
        };

        debug!(tier = %tier, %outcome, version, "Snapshot committed");
        // No subscribers is fine.
        let _ = self.events.send(SnapshotEvent {
            tier,
            outcome,
            version,
            committed_at: at,
        });
        Some(version)
    }

    /// Drops entities rejected by `keep_entity` and tiers rejected by
    /// `keep_tier`, publishing the result if anything was removed.
    ///
    /// Returns the number of entities plus tier entries removed.
    pub fn prune<E, T>(&self, keep_entity: E, keep_tier: T) -> usize
    where
        E: FnMut(&armory_core::TrackedEntity) -> bool,
        T: FnMut(FetchTier) -> bool,
    {
        let mut working = self.lock();
        let removed = working.retain_entities(keep_entity) + working.retain_tiers(keep_tier);
        if removed > 0 {
            self.published.send_replace(Arc::new(working.clone()));
            debug!(removed, version = working.version(), "Pruned snapshot");
        }
        removed
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        // A panic while applying leaves the previous published copy intact.
        self.working.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("version", &self.published.borrow().version())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
