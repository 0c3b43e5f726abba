//! Domain models for Armory Watch.
//!
//! This module contains the data structures shared by every other crate:
//! where to send requests, what is tracked, how often, and what comes back.
//!
//! ## Submodules
//!
//! - [`region`] - Region routing (Region, RegionEndpoints, resolve_host)
//! - [`entity`] - Tracked characters and realms
//! - [`tier`] - Fetch tiers and their default cadence
//! - [`metric`] - Normalized metric records
//! - [`snapshot`] - Committed snapshot of all metrics

pub mod entity;
pub mod metric;
pub mod region;
pub mod snapshot;
pub mod tier;

// Re-export everything at the models level
pub use entity::{TrackedEntity, slugify};
pub use metric::{ErrorKind, MetricRecord, MetricUnit, MetricValue, Population};
pub use region::{Region, RegionEndpoints, resolve_host};
pub use snapshot::{CycleOutcome, EntityUpdate, Snapshot, TierSnapshot};
pub use tier::FetchTier;
