// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Armory Watch Core
//!
//! Core types and models shared by the Armory Watch crates.
//!
//! This crate has no I/O. It defines:
//!
//! - Region routing (API host, OAuth host, locale per region)
//! - Tracked entities (characters and realms) and fetch tiers
//! - Normalized metric records
//! - The committed snapshot of all metrics
//!
//! ## Key Types
//!
//! ### Routing
//! - [`Region`] - Supported API regions
//! - [`RegionEndpoints`] - Resolved hosts and locale
//! - [`resolve_host`] - Pure lookup from a region code
//!
//! ### Tracking
//! - [`TrackedEntity`] - A character or realm
//! - [`FetchTier`] - Category of data polled at its own cadence
//!
//! ### Output
//! - [`MetricRecord`] - One normalized metric with freshness metadata
//! - [`Snapshot`] - Latest committed metrics of every entity
//! - [`TierSnapshot`] - One tier's committed records for one entity

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Routing
    Region,
    RegionEndpoints,
    resolve_host,
    // Tracking
    FetchTier,
    TrackedEntity,
    slugify,
    // Metrics
    ErrorKind,
    MetricRecord,
    MetricUnit,
    MetricValue,
    Population,
    // Snapshot
    CycleOutcome,
    EntityUpdate,
    Snapshot,
    TierSnapshot,
};
