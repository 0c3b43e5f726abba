// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Armory Watch Store
//!
//! Scheduling and state for Armory Watch.
//!
//! This crate provides:
//!
//! - **UpdateCoordinator**: Per-tier timers, bounded fan-out and atomic commits
//! - **SnapshotStore**: Latest-value snapshot with watch and event channels
//! - **TrackerConfig**: Host-supplied configuration with defaults
//! - **Logging**: `tracing` subscriber setup for hosts without their own
//!
//! ## Usage
//!
//! ```ignore
//! use armory_store::{TrackerConfig, UpdateCoordinator, init_logging};
//! use armory_core::{Region, TrackedEntity};
//!
//! let config = TrackerConfig::new(Region::Us, client_id, client_secret)
//!     .with_entity(TrackedEntity::character("Thrall", "Stormrage", Region::Us));
//! init_logging(config.log_level);
//!
//! let coordinator = UpdateCoordinator::new(config)?;
//! coordinator.start().await?;
//!
//! // Re-render whenever a tier commits
//! let mut rx = coordinator.watch();
//! while rx.changed().await.is_ok() {
//!     let snapshot = rx.borrow().clone();
//!     println!("Snapshot v{}", snapshot.version());
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod snapshot_store;

pub use config::{FetchConfig, TierIntervals, TrackerConfig};
pub use coordinator::{CycleReport, FetchAttempt, TierPhase, TierStatus, UpdateCoordinator};
pub use error::StoreError;
pub use logging::{LogLevel, init_logging};
pub use snapshot_store::{SnapshotEvent, SnapshotStore};
