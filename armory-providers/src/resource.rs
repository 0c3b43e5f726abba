//! Resource fetcher trait and payload types.
//!
//! A resource fetcher turns one tracked entity into one [`TierPayload`]:
//! it builds the request paths, calls the executor and parses the
//! responses into a tier-specific intermediate structure.

use async_trait::async_trait;
use armory_core::{FetchTier, Region, TrackedEntity};
use armory_fetch::{FetchContext, FetchError, RawResponse};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::mythic_plus::MythicPlusSummary;
use crate::profile::ProfileSummary;
use crate::pvp::PvpSummary;
use crate::raid::RaidProgress;
use crate::realm::RealmStatus;

// ============================================================================
// Tier Payload
// ============================================================================

/// Parsed result of one entity's fetch, one variant per tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierPayload {
    /// Character profile.
    Profile(ProfileSummary),
    /// PvP ratings.
    Pvp(PvpSummary),
    /// Raid progression.
    Raid(RaidProgress),
    /// Mythic+ season summary.
    MythicPlus(MythicPlusSummary),
    /// Realm status.
    Realm(RealmStatus),
}

impl TierPayload {
    /// Tier this payload belongs to.
    pub fn tier(&self) -> FetchTier {
        match self {
            Self::Profile(_) => FetchTier::Basic,
            Self::Pvp(_) => FetchTier::PvP,
            Self::Raid(_) => FetchTier::Raid,
            Self::MythicPlus(_) => FetchTier::MythicPlus,
            Self::Realm(_) => FetchTier::ServerStatus,
        }
    }
}

// ============================================================================
// Resource Fetcher Trait
// ============================================================================

/// Fetches one tier's data for one entity.
///
/// ## Implementing a Fetcher
///
/// ```ignore
/// struct ProfileFetcher;
///
/// #[async_trait]
/// impl ResourceFetcher for ProfileFetcher {
///     fn id(&self) -> &'static str {
///         "profile"
///     }
///
///     fn tier(&self) -> FetchTier {
///         FetchTier::Basic
///     }
///
///     async fn fetch(&self, ctx: &FetchContext, entity: &TrackedEntity) -> Result<TierPayload, FetchError> {
///         let target = CharacterTarget::for_entity(entity, self.tier())?;
///         let response = ctx.get(target.region, &target.path, &target.params()).await?;
///         Ok(TierPayload::Profile(parse_profile(&response.body, None)?))
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Stable identifier used in logs.
    fn id(&self) -> &'static str;

    /// Tier served by this fetcher.
    fn tier(&self) -> FetchTier;

    /// Fetches and parses the tier's data for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if the tier does not apply to the
    /// entity, [`FetchError::Schema`] if a required field is missing, and
    /// any executor error as-is.
    async fn fetch(
        &self,
        ctx: &FetchContext,
        entity: &TrackedEntity,
    ) -> Result<TierPayload, FetchError>;
}

// ============================================================================
// Request Targets
// ============================================================================

/// Where a character's profile resources live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterTarget {
    /// Region to route to.
    pub region: Region,
    /// Base profile path, e.g. `/profile/wow/character/stormrage/thrall`.
    pub path: String,
    /// Profile namespace, e.g. `profile-us`.
    pub namespace: String,
}

impl CharacterTarget {
    /// Resolves the target of a character entity.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if `tier` does not apply to `entity`.
    pub fn for_entity(entity: &TrackedEntity, tier: FetchTier) -> Result<Self, FetchError> {
        ensure_applies(entity, tier)?;
        let path = entity
            .profile_path()
            .ok_or_else(|| FetchError::Config(format!("{entity} is not a character")))?;
        let region = entity.region();
        Ok(Self {
            region,
            path,
            namespace: region.profile_namespace(),
        })
    }

    /// Path of a sub-resource, e.g. `pvp-summary`.
    pub fn sub_path(&self, resource: &str) -> String {
        format!("{}/{}", self.path, resource)
    }

    /// Query parameters for every profile request.
    pub fn params(&self) -> [(&str, &str); 1] {
        [("namespace", self.namespace.as_str())]
    }
}

/// Fails with [`FetchError::Config`] if `tier` does not apply to `entity`.
pub fn ensure_applies(entity: &TrackedEntity, tier: FetchTier) -> Result<(), FetchError> {
    if tier.applies_to(entity) {
        Ok(())
    } else {
        Err(FetchError::Config(format!(
            "{tier} does not apply to {}",
            entity.key()
        )))
    }
}

/// Treats `NotFound` as "no data" and passes every other result through.
pub fn optional(result: Result<RawResponse, FetchError>) -> Result<Option<RawResponse>, FetchError> {
    match result {
        Ok(response) => Ok(Some(response)),
        Err(FetchError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

// ============================================================================
// Shared Wire Types
// ============================================================================

/// A `{ "name": ... }` reference as returned with an explicit locale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedRef {
    /// Localized name.
    #[serde(default)]
    pub name: Option<String>,
}

/// A `{ "type": ..., "name": ... }` enum-like field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypedRef {
    /// Machine-readable type.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Localized name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Decodes a JSON body, mapping failures to [`FetchError::Schema`].
pub(crate) fn decode<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Schema(format!("{what}: {e}")))
}
