//! Profile fetcher.

use async_trait::async_trait;
use armory_core::{FetchTier, TrackedEntity};
use armory_fetch::{FetchContext, FetchError};
use tracing::{debug, instrument};

use super::parser::parse_profile;
use crate::resource::{CharacterTarget, ResourceFetcher, TierPayload, optional};

/// Fetches the Basic tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileFetcher;

#[async_trait]
impl ResourceFetcher for ProfileFetcher {
    fn id(&self) -> &'static str {
        "profile"
    }

    fn tier(&self) -> FetchTier {
        FetchTier::Basic
    }

    #[instrument(skip(self, ctx), fields(entity = %entity.key()))]
    async fn fetch(&self, ctx: &FetchContext, entity: &TrackedEntity) -> Result<TierPayload, FetchError> {
        let target = CharacterTarget::for_entity(entity, self.tier())?;
        let params = target.params();

        let response = ctx.get(target.region, &target.path, &params).await?;
        let summary = parse_profile(&response.body, None)?;
        if summary.item_level.is_some() {
            return Ok(TierPayload::Profile(summary));
        }

        debug!("Profile has no item level, fetching equipment");
        let equipment = optional(ctx.get(target.region, &target.sub_path("equipment"), &params).await)?;
        let summary = match equipment {
            Some(equipment) => parse_profile(&response.body, Some(&equipment.body))?,
            None => summary,
        };

        Ok(TierPayload::Profile(summary))
    }
}
