//! Fetcher registry.
//!
//! The registry maps each [`FetchTier`] to its static fetcher and is the
//! central point the scheduler dispatches through.

use std::sync::OnceLock;

use armory_core::FetchTier;

use crate::mythic_plus::MythicPlusFetcher;
use crate::profile::ProfileFetcher;
use crate::pvp::PvpFetcher;
use crate::raid::RaidFetcher;
use crate::realm::RealmFetcher;
use crate::resource::ResourceFetcher;

// ============================================================================
// Static Registry
// ============================================================================

static PROFILE: ProfileFetcher = ProfileFetcher;
static PVP: PvpFetcher = PvpFetcher;
static RAID: RaidFetcher = RaidFetcher;
static MYTHIC_PLUS: MythicPlusFetcher = MythicPlusFetcher;
static REALM: RealmFetcher = RealmFetcher;

/// Static storage for the fetcher list, in tier order.
static FETCHERS: OnceLock<Vec<&'static dyn ResourceFetcher>> = OnceLock::new();

fn init_fetchers() -> Vec<&'static dyn ResourceFetcher> {
    FetchTier::all().iter().map(|tier| FetcherRegistry::get(*tier)).collect()
}

// ============================================================================
// Fetcher Registry
// ============================================================================

/// Global registry of resource fetchers.
pub struct FetcherRegistry;

impl FetcherRegistry {
    /// Returns the fetcher of a tier.
    pub fn get(tier: FetchTier) -> &'static dyn ResourceFetcher {
        match tier {
            FetchTier::Basic => &PROFILE,
            FetchTier::PvP => &PVP,
            FetchTier::Raid => &RAID,
            FetchTier::MythicPlus => &MYTHIC_PLUS,
            FetchTier::ServerStatus => &REALM,
        }
    }

    /// Returns every fetcher, in [`FetchTier::all`] order.
    pub fn all() -> &'static [&'static dyn ResourceFetcher] {
        FETCHERS.get_or_init(init_fetchers)
    }

    /// Looks up a fetcher by its id.
    pub fn get_by_id(id: &str) -> Option<&'static dyn ResourceFetcher> {
        Self::all().iter().copied().find(|f| f.id() == id)
    }
}

// ============================================================================
// Tests
// ============================================================================
