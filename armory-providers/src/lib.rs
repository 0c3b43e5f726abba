// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Armory Watch Fetchers
//!
//! Resource fetchers and the normalizer for Armory Watch.
//!
//! Each tier has one fetcher module laid out the same way:
//!
//! - **api**: Serde types for the raw API responses
//! - **parser**: Body parsing into a tier-specific summary
//! - **fetcher**: The [`ResourceFetcher`] that issues the requests
//!
//! | Tier | Fetcher | Requests |
//! |------|---------|----------|
//! | Basic | [`ProfileFetcher`] | profile, equipment (fallback) |
//! | PvP | [`PvpFetcher`] | pvp-summary, pvp-bracket/{2v2,3v3,rbg} |
//! | Raid | [`RaidFetcher`] | encounters/raids |
//! | MythicPlus | [`MythicPlusFetcher`] | mythic-keystone-profile, season/{id} |
//! | ServerStatus | [`RealmFetcher`] | realm/{slug}, connected-realm/{id} |
//!
//! ## Usage
//!
//! ```ignore
//! use armory_core::{FetchTier, Region, TrackedEntity};
//! use armory_providers::{FetcherRegistry, normalize};
//!
//! let thrall = TrackedEntity::character("Thrall", "Stormrage", Region::Us);
//! let fetcher = FetcherRegistry::get(FetchTier::Basic);
//! let payload = fetcher.fetch(&ctx, &thrall).await?;
//! let records = normalize(&payload, &thrall, chrono::Utc::now());
//! ```

pub mod normalizer;
pub mod registry;
pub mod resource;

// Tier modules (alphabetical)
pub mod mythic_plus;
pub mod profile;
pub mod pvp;
pub mod raid;
pub mod realm;


pub use normalizer::normalize;
pub use registry::FetcherRegistry;
pub use resource::{CharacterTarget, ResourceFetcher, TierPayload, ensure_applies, optional};

pub use mythic_plus::{MythicPlusFetcher, MythicPlusSummary};
pub use profile::{ProfileFetcher, ProfileSummary};
pub use pvp::{BracketRating, PvpBracket, PvpFetcher, PvpSummary};
pub use raid::{Difficulty, RaidFetcher, RaidProgress};
pub use realm::{RealmFetcher, RealmStatus};
