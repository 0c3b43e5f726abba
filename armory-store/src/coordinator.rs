//! Update coordinator.
//!
//! Runs one timer task per [`FetchTier`]. Each fire fans out one fetch per
//! applicable entity, waits for all of them, normalizes the results and
//! commits the tier to the [`SnapshotStore`] in one step.
//!
//! ## Cycle lifecycle
//!
//! ```text
//! Idle ──fire──► Fetching ──all fetches done──► commit ──► Idle
//!                   │
//!                   └──cancel (shutdown / update_config)──► discard ──► Idle
//! ```
//!
//! At most one cycle per tier runs at a time. A timer fire or manual refresh
//! that finds its tier busy is coalesced, not queued.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use armory_core::{CycleOutcome, EntityUpdate, ErrorKind, FetchTier, Snapshot, TrackedEntity};
use armory_fetch::{FetchContext, FetchError};
use armory_providers::{FetcherRegistry, ResourceFetcher, normalize};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::TrackerConfig;
use crate::error::StoreError;
use crate::snapshot_store::{SnapshotEvent, SnapshotStore};

/// How long `shutdown` and `update_config` wait for timer tasks to stop.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Reports and Status
// ============================================================================

/// One entity's fetch within a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// Entity fetched.
    pub entity: TrackedEntity,
    /// Whether the fetch succeeded.
    pub success: bool,
    /// Failure kind, if it failed.
    pub error: Option<ErrorKind>,
    /// Time spent, including retries.
    pub duration: Duration,
}

/// Result of one committed tier cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Tier that ran.
    pub tier: FetchTier,
    /// Overall outcome.
    pub outcome: CycleOutcome,
    /// Per-entity attempts, in completion order.
    pub attempts: Vec<FetchAttempt>,
    /// Wall time of the cycle.
    pub duration: Duration,
    /// Snapshot version after the commit.
    pub version: u64,
}

impl CycleReport {
    /// Number of successful fetches.
    pub fn succeeded(&self) -> usize {
        self.attempts.iter().filter(|a| a.success).count()
    }

    /// Number of failed fetches.
    pub fn failed(&self) -> usize {
        self.attempts.len() - self.succeeded()
    }

    /// Attempt for one entity.
    pub fn attempt(&self, entity: &TrackedEntity) -> Option<&FetchAttempt> {
        self.attempts.iter().find(|a| &a.entity == entity)
    }
}

/// Whether a tier is fetching right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TierPhase {
    /// Waiting for the next fire.
    #[default]
    Idle,
    /// A cycle is running.
    Fetching,
}

/// Scheduler view of one tier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TierStatus {
    /// Current phase.
    pub phase: TierPhase,
    /// Outcome of the last committed cycle.
    pub last_outcome: Option<CycleOutcome>,
    /// When the last cycle committed.
    pub last_run: Option<DateTime<Utc>>,
    /// Cycles completed since creation.
    pub cycles: u64,
}

// ============================================================================
// Internal State
// ============================================================================

/// Everything derived from one configuration.
struct Runtime {
    config: TrackerConfig,
    entities: Vec<TrackedEntity>,
    ctx: Arc<FetchContext>,
    /// Parent of every cycle token; cancelled on reconfiguration and
    /// shutdown.
    generation: CancellationToken,
}

impl Runtime {
    fn new(config: TrackerConfig, ctx: Arc<FetchContext>) -> Self {
        Self {
            entities: config.effective_entities(),
            config,
            ctx,
            generation: CancellationToken::new(),
        }
    }

    fn applicable(&self, tier: FetchTier) -> Vec<TrackedEntity> {
        self.entities
            .iter()
            .filter(|e| tier.applies_to(e))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct TierState {
    running: AtomicBool,
    status: Mutex<TierStatus>,
}

impl TierState {
    fn status(&self) -> std::sync::MutexGuard<'_, TierStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a tier as fetching for as long as it lives.
struct CycleGuard<'a> {
    state: &'a TierState,
}

impl<'a> CycleGuard<'a> {
    fn acquire(state: &'a TierState, tier: FetchTier) -> Result<Self, StoreError> {
        if state
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StoreError::CycleInProgress(tier));
        }
        state.status().phase = TierPhase::Fetching;
        Ok(Self { state })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.state.status().phase = TierPhase::Idle;
        self.state.running.store(false, Ordering::Release);
    }
}

struct Inner {
    runtime: RwLock<Arc<Runtime>>,
    store: SnapshotStore,
    tiers: HashMap<FetchTier, TierState>,
}

impl Inner {
    fn runtime(&self) -> Arc<Runtime> {
        Arc::clone(&self.runtime.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn set_runtime(&self, runtime: Runtime) {
        *self.runtime.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(runtime);
    }

    fn tier_state(&self, tier: FetchTier) -> &TierState {
        // Every tier is inserted in `UpdateCoordinator::new`.
        &self.tiers[&tier]
    }

    /// Spawns one timer task per tier under the current generation.
    fn spawn_tier_loops(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let runtime = self.runtime();
        FetchTier::all()
            .iter()
            .map(|tier| {
                let inner = Arc::clone(self);
                let period = runtime.config.intervals.interval(*tier);
                let cancel = runtime.generation.clone();
                tokio::spawn(tier_loop(inner, *tier, period, cancel))
            })
            .collect()
    }

    /// Runs one cycle of `tier` and commits it.
    #[instrument(skip(self, tier), fields(tier = %tier))]
    async fn run_cycle(&self, tier: FetchTier) -> Result<CycleReport, StoreError> {
        let state = self.tier_state(tier);
        let _guard = CycleGuard::acquire(state, tier)?;

        let runtime = self.runtime();
        if !runtime.config.is_enabled(tier) {
            return Err(StoreError::Config(format!("{tier} is not enabled")));
        }

        let cancel = runtime.generation.child_token();
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled(tier));
        }

        let started = Instant::now();
        let entities = runtime.applicable(tier);
        if entities.is_empty() {
            debug!("No entities for tier");
            let at = Utc::now();
            record(state, CycleOutcome::Success, at);
            return Ok(CycleReport {
                tier,
                outcome: CycleOutcome::Success,
                attempts: Vec::new(),
                duration: started.elapsed(),
                version: self.store.snapshot().version(),
            });
        }

        info!(entities = entities.len(), "Starting cycle");
        let fetcher = FetcherRegistry::get(tier);
        let cap = runtime.ctx.settings.max_concurrency.max(1);
        let fan_out = stream::iter(entities)
            .map(|entity| fetch_entity(&runtime.ctx, fetcher, entity))
            .buffer_unordered(cap)
            .collect::<Vec<_>>();

        let results = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("Cycle cancelled, discarding results");
                return Err(StoreError::Cancelled(tier));
            }
            results = fan_out => results,
        };

        let (updates, attempts): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        let succeeded = attempts.iter().filter(|a: &&FetchAttempt| a.success).count();
        let outcome = CycleOutcome::from_counts(succeeded, attempts.len() - succeeded);
        let at = Utc::now();

        let version = self
            .store
            .commit(tier, outcome, at, |snapshot| self.apply(snapshot, tier, updates, at, &cancel))
            .ok_or_else(|| {
                info!("Cycle cancelled before commit, discarding results");
                StoreError::Cancelled(tier)
            })?;

        record(state, outcome, at);
        let report = CycleReport {
            tier,
            outcome,
            attempts,
            duration: started.elapsed(),
            version,
        };
        info!(
            %outcome,
            succeeded = report.succeeded(),
            failed = report.failed(),
            version,
            "Cycle committed"
        );
        Ok(report)
    }

    /// Commit step, run under the store lock.
    ///
    /// Only entities still configured at commit time are written.
    fn apply(
        &self,
        snapshot: &mut Snapshot,
        tier: FetchTier,
        updates: Vec<(TrackedEntity, EntityUpdate)>,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let runtime = self.runtime();
        let configured: HashSet<&TrackedEntity> = runtime.entities.iter().collect();
        let updates: Vec<_> = updates
            .into_iter()
            .filter(|(entity, _)| {
                let keep = configured.contains(entity);
                if !keep {
                    debug!(entity = %entity.key(), "Dropping result for removed entity");
                }
                keep
            })
            .collect();

        snapshot.apply_tier(tier, updates, at);
        true
    }
}

fn record(state: &TierState, outcome: CycleOutcome, at: DateTime<Utc>) {
    let mut status = state.status();
    status.last_outcome = Some(outcome);
    status.last_run = Some(at);
    status.cycles += 1;
}

/// Fetches and normalizes one entity under the per-fetch timeout.
async fn fetch_entity(
    ctx: &FetchContext,
    fetcher: &'static dyn ResourceFetcher,
    entity: TrackedEntity,
) -> ((TrackedEntity, EntityUpdate), FetchAttempt) {
    let started = Instant::now();
    let limit = ctx.fetch_timeout();

    let result = match tokio::time::timeout(limit, fetcher.fetch(ctx, &entity)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Unavailable(format!("fetch timed out after {limit:?}"))),
    };

    let (update, error) = match result {
        Ok(payload) => (EntityUpdate::Fresh(normalize(&payload, &entity, Utc::now())), None),
        Err(e) => {
            warn!(fetcher = fetcher.id(), entity = %entity.key(), error = %e, "Fetch failed");
            (EntityUpdate::Failed(e.kind()), Some(e.kind()))
        }
    };

    let attempt = FetchAttempt {
        entity: entity.clone(),
        success: error.is_none(),
        error,
        duration: started.elapsed(),
    };
    ((entity, update), attempt)
}

/// Timer task of one tier. The first tick fires immediately.
async fn tier_loop(inner: Arc<Inner>, tier: FetchTier, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(tier = %tier, ?period, "Tier timer started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(tier = %tier, "Tier timer stopped");
                break;
            }
            _ = ticker.tick() => {
                if !inner.runtime().config.is_enabled(tier) {
                    continue;
                }
                match inner.run_cycle(tier).await {
                    Ok(_) => {}
                    Err(StoreError::CycleInProgress(_)) => {
                        debug!(tier = %tier, "Cycle still running, skipping fire");
                    }
                    Err(StoreError::Cancelled(_)) => {}
                    Err(e) => warn!(tier = %tier, error = %e, "Cycle failed"),
                }
            }
        }
    }
}

/// Awaits timer tasks, giving up after [`JOIN_TIMEOUT`].
async fn join_tasks(handles: Vec<JoinHandle<()>>) -> Result<(), StoreError> {
    let results = tokio::time::timeout(JOIN_TIMEOUT, futures::future::join_all(handles))
        .await
        .map_err(|_| StoreError::Timeout(JOIN_TIMEOUT))?;

    for result in results {
        if let Err(e) = result {
            if e.is_panic() {
                error!(error = %e, "Tier timer panicked");
            }
        }
    }
    Ok(())
}

fn build_context(config: &TrackerConfig) -> Result<Arc<FetchContext>, StoreError> {
    FetchContext::builder()
        .credentials(config.credentials())
        .settings(config.fetch_settings())
        .game(config.game.clone())
        .build()
        .map(Arc::new)
        .map_err(|e| StoreError::Config(e.to_string()))
}

// ============================================================================
// Update Coordinator
// ============================================================================

/// Schedules tier cycles and owns the snapshot.
///
/// ```ignore
/// let coordinator = UpdateCoordinator::new(config)?;
/// let mut events = coordinator.subscribe();
/// coordinator.start().await?;
///
/// while let Ok(event) = events.recv().await {
///     let snapshot = coordinator.snapshot();
///     // render snapshot.metrics_for(...)
/// }
///
/// coordinator.shutdown().await?;
/// ```
pub struct UpdateCoordinator {
    inner: Arc<Inner>,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl UpdateCoordinator {
    /// Creates a coordinator. No request is made until [`start`](Self::start)
    /// or [`refresh_now`](Self::refresh_now).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the configuration is invalid.
    pub fn new(config: TrackerConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let ctx = build_context(&config)?;

        let tiers = FetchTier::all()
            .iter()
            .map(|tier| (*tier, TierState::default()))
            .collect();

        Ok(Self {
            inner: Arc::new(Inner {
                runtime: RwLock::new(Arc::new(Runtime::new(config, ctx))),
                store: SnapshotStore::new(),
                tiers,
            }),
            tasks: tokio::sync::Mutex::new(Vec::new()),
        })
    }

    /// Starts the tier timers. Every enabled tier fires once immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyRunning`] if started twice, and
    /// [`StoreError::Fetch`] if `verify_on_start` is set and the credentials
    /// are rejected.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        if tasks.iter().any(|h| !h.is_finished()) {
            return Err(StoreError::AlreadyRunning);
        }

        let mut runtime = self.inner.runtime();
        if runtime.generation.is_cancelled() {
            // Restart after shutdown.
            self.inner.set_runtime(Runtime::new(runtime.config.clone(), Arc::clone(&runtime.ctx)));
            runtime = self.inner.runtime();
        }

        if runtime.config.verify_on_start {
            info!(region = %runtime.config.region, "Verifying credentials");
            runtime.ctx.tokens.verify(runtime.config.region).await?;
        }

        *tasks = self.inner.spawn_tier_loops();
        info!(
            tiers = runtime.config.enabled_tiers.len(),
            entities = runtime.entities.len(),
            "Coordinator started"
        );
        Ok(())
    }

    /// Runs one cycle of `tier` now and waits for its commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CycleInProgress`] if the tier is already
    /// fetching, [`StoreError::Config`] if the tier is disabled and
    /// [`StoreError::Cancelled`] if the cycle was cancelled.
    pub async fn refresh_now(&self, tier: FetchTier) -> Result<CycleReport, StoreError> {
        self.inner.run_cycle(tier).await
    }

    /// Replaces the configuration.
    ///
    /// Running cycles are cancelled and discarded, removed entities and
    /// disabled tiers are pruned from the snapshot, and timers restart with
    /// the new intervals.
    /// The credential cache and limiters are kept unless region, credentials
    /// or fetch settings changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the new configuration is invalid;
    /// the old one stays in effect.
    #[instrument(skip(self, config))]
    pub async fn update_config(&self, config: TrackerConfig) -> Result<(), StoreError> {
        config.validate()?;

        let mut tasks = self.tasks.lock().await;
        let old = self.inner.runtime();
        let ctx = if old.config.needs_new_context(&config) {
            info!(region = %config.region, "Rebuilding fetch context");
            build_context(&config)?
        } else {
            Arc::clone(&old.ctx)
        };

        let was_running = tasks.iter().any(|h| !h.is_finished());
        old.generation.cancel();
        join_tasks(std::mem::take(&mut *tasks)).await?;

        let runtime = Runtime::new(config, ctx);
        let keep: HashSet<TrackedEntity> = runtime.entities.iter().cloned().collect();
        let enabled = runtime.config.enabled_tiers.clone();
        let entities = keep.len();
        self.inner.set_runtime(runtime);

        let removed = self
            .inner
            .store
            .prune(|e| keep.contains(e), |tier| enabled.contains(&tier));
        info!(entities, removed, "Configuration updated");

        if was_running {
            *tasks = self.inner.spawn_tier_loops();
        }
        Ok(())
    }

    /// Stops the timers and cancels running cycles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotRunning`] if the coordinator was not started
    /// and [`StoreError::Timeout`] if the timers do not stop within 5s.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        if !tasks.iter().any(|h| !h.is_finished()) {
            tasks.clear();
            return Err(StoreError::NotRunning);
        }

        self.inner.runtime().generation.cancel();
        join_tasks(std::mem::take(&mut *tasks)).await?;
        info!("Coordinator stopped");
        Ok(())
    }

    /// Returns true while the timers are running.
    pub fn is_running(&self) -> bool {
        self.tasks
            .try_lock()
            .ok()
            .is_some_and(|tasks| tasks.iter().any(|h| !h.is_finished()))
    }

    /// Latest committed snapshot. Never triggers a fetch.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    /// Receiver of commit events.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotEvent> {
        self.inner.store.subscribe()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.store.watch()
    }

    /// Scheduler status of one tier.
    pub fn tier_status(&self, tier: FetchTier) -> TierStatus {
        self.inner.tier_state(tier).status().clone()
    }

    /// Current configuration.
    pub fn config(&self) -> TrackerConfig {
        self.inner.runtime().config.clone()
    }

    /// Entities polled under the current configuration, implied realms
    /// included.
    pub fn entities(&self) -> Vec<TrackedEntity> {
        self.inner.runtime().entities.clone()
    }
}

impl Drop for UpdateCoordinator {
    fn drop(&mut self) {
        self.inner.runtime().generation.cancel();
    }
}

impl std::fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("running", &self.is_running())
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
