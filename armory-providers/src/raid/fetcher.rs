//! Raid fetcher.

use async_trait::async_trait;
use armory_core::{FetchTier, TrackedEntity};
use armory_fetch::{FetchContext, FetchError};
use tracing::instrument;

use super::parser::parse_raid_progress;
use crate::resource::{CharacterTarget, ResourceFetcher, TierPayload};

/// Fetches the Raid tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaidFetcher;

#[async_trait]
impl ResourceFetcher for RaidFetcher {
    fn id(&self) -> &'static str {
        "raid"
    }

    fn tier(&self) -> FetchTier {
        FetchTier::Raid
    }

    #[instrument(skip(self, ctx), fields(entity = %entity.key()))]
    async fn fetch(&self, ctx: &FetchContext, entity: &TrackedEntity) -> Result<TierPayload, FetchError> {
        let target = CharacterTarget::for_entity(entity, self.tier())?;
        let response = ctx
            .get(target.region, &target.sub_path("encounters/raids"), &target.params())
            .await?;

        let progress = parse_raid_progress(&response.body, &ctx.game.current_expansion)?;
        Ok(TierPayload::Raid(progress))
    }
}
