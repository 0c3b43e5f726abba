//! Mythic+ fetcher.

use async_trait::async_trait;
use armory_core::{FetchTier, TrackedEntity};
use armory_fetch::{FetchContext, FetchError};
use tracing::{debug, instrument};

use super::api::KeystoneProfile;
use super::parser::{current_season_id, parse_mythic_plus};
use crate::resource::{CharacterTarget, ResourceFetcher, TierPayload, decode, optional};

/// Fetches the MythicPlus tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct MythicPlusFetcher;

#[async_trait]
impl ResourceFetcher for MythicPlusFetcher {
    fn id(&self) -> &'static str {
        "mythic-plus"
    }

    fn tier(&self) -> FetchTier {
        FetchTier::MythicPlus
    }

    #[instrument(skip(self, ctx), fields(entity = %entity.key()))]
    async fn fetch(&self, ctx: &FetchContext, entity: &TrackedEntity) -> Result<TierPayload, FetchError> {
        let target = CharacterTarget::for_entity(entity, self.tier())?;
        let params = target.params();

        let profile_path = target.sub_path("mythic-keystone-profile");
        let response = ctx.get(target.region, &profile_path, &params).await?;
        let default_season = ctx.game.default_mythic_plus_season;
        let profile: KeystoneProfile = decode(&response.body, "keystone profile")?;

        let season_id = current_season_id(&profile, default_season);
        let season_path = format!("{profile_path}/season/{season_id}");
        let season = optional(ctx.get(target.region, &season_path, &params).await)?;
        if season.is_none() {
            debug!(season_id, "No keystone runs this season");
        }

        let season_body = season.as_ref().map(|r| r.body.as_str());
        let summary = parse_mythic_plus(&response.body, season_body, default_season)?;
        Ok(TierPayload::MythicPlus(summary))
    }
}
