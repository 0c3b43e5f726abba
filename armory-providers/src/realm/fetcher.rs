//! Realm status fetcher.

use async_trait::async_trait;
use armory_core::{FetchTier, TrackedEntity};
use armory_fetch::{FetchContext, FetchError};
use tracing::{debug, instrument};

use super::api::RealmResponse;
use super::parser::{connected_realm_id, parse_realm_status};
use crate::resource::{ResourceFetcher, TierPayload, decode, ensure_applies};

/// Fetches the ServerStatus tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealmFetcher;

#[async_trait]
impl ResourceFetcher for RealmFetcher {
    fn id(&self) -> &'static str {
        "realm"
    }

    fn tier(&self) -> FetchTier {
        FetchTier::ServerStatus
    }

    #[instrument(skip(self, ctx), fields(entity = %entity.key()))]
    async fn fetch(&self, ctx: &FetchContext, entity: &TrackedEntity) -> Result<TierPayload, FetchError> {
        ensure_applies(entity, self.tier())?;
        let region = entity.region();
        let namespace = region.dynamic_namespace();
        let params = [("namespace", namespace.as_str())];

        let realm_response = ctx
            .get(region, &format!("/data/wow/realm/{}", entity.realm_slug()), &params)
            .await?;
        let realm: RealmResponse = decode(&realm_response.body, "realm")?;

        let connected_id = connected_realm_id(&realm);
        debug!(realm_id = realm.id, connected_id, "Resolved connected realm");
        let connected_response = ctx
            .get(region, &format!("/data/wow/connected-realm/{connected_id}"), &params)
            .await?;

        let status = parse_realm_status(&realm_response.body, &connected_response.body)?;
        Ok(TierPayload::Realm(status))
    }
}
