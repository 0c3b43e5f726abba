//! PvP fetcher.

use async_trait::async_trait;
use armory_core::{FetchTier, TrackedEntity};
use armory_fetch::{FetchContext, FetchError};
use tracing::instrument;

use super::parser::{PvpBracket, PvpSummary, parse_bracket, parse_pvp_summary};
use crate::resource::{CharacterTarget, ResourceFetcher, TierPayload, optional};

/// Fetches the PvP tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct PvpFetcher;

#[async_trait]
impl ResourceFetcher for PvpFetcher {
    fn id(&self) -> &'static str {
        "pvp"
    }

    fn tier(&self) -> FetchTier {
        FetchTier::PvP
    }

    #[instrument(skip(self, ctx), fields(entity = %entity.key()))]
    async fn fetch(&self, ctx: &FetchContext, entity: &TrackedEntity) -> Result<TierPayload, FetchError> {
        let target = CharacterTarget::for_entity(entity, self.tier())?;
        let params = target.params();

        let summary = ctx.get(target.region, &target.sub_path("pvp-summary"), &params).await?;
        let honor_level = parse_pvp_summary(&summary.body)?;

        let mut brackets = Vec::with_capacity(PvpBracket::all().len());
        for bracket in PvpBracket::all() {
            let path = target.sub_path(&format!("pvp-bracket/{}", bracket.path_segment()));
            let response = optional(ctx.get(target.region, &path, &params).await)?;
            brackets.push(parse_bracket(*bracket, response.as_ref().map(|r| r.body.as_str()))?);
        }

        Ok(TierPayload::Pvp(PvpSummary { honor_level, brackets }))
    }
}
