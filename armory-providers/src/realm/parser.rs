//! Realm response parser.

use armory_core::Population;
use armory_fetch::FetchError;
use tracing::debug;
use url::Url;

use super::api::{ConnectedRealmResponse, RealmResponse};
use crate::resource::decode;

/// Parsed realm status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmStatus {
    /// Realm id.
    pub realm_id: i64,
    /// True when the connected realm is up.
    pub online: bool,
    /// Status name, e.g. `Up`.
    pub status: String,
    /// Population bucket, `None` when the type is unknown.
    pub population: Option<Population>,
    /// Whether logins are queued.
    pub has_queue: bool,
    /// IANA timezone.
    pub timezone: Option<String>,
    /// Realm locale.
    pub locale: Option<String>,
}

/// Connected realm id of a realm.
///
/// Taken from the `connected_realm` link when it ends in a numeric id,
/// otherwise the realm's own id.
pub fn connected_realm_id(realm: &RealmResponse) -> i64 {
    realm
        .connected_realm
        .as_ref()
        .and_then(|link| Url::parse(&link.href).ok())
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|last| last.parse().ok())
        .unwrap_or(realm.id)
}

/// Parses the realm and connected realm bodies.
///
/// # Errors
///
/// Returns [`FetchError::Schema`] if the realm has no `id` or the connected
/// realm has no `status.type`.
pub fn parse_realm_status(realm_json: &str, connected_json: &str) -> Result<RealmStatus, FetchError> {
    let realm: RealmResponse = decode(realm_json, "realm")?;
    let connected: ConnectedRealmResponse = decode(connected_json, "connected realm")?;
    Ok(summarize(realm, connected))
}

fn summarize(realm: RealmResponse, connected: ConnectedRealmResponse) -> RealmStatus {
    let population = connected.population.kind.as_deref().and_then(Population::from_api);
    if population.is_none() {
        debug!(population = ?connected.population.kind, "Unknown realm population");
    }

    let online = connected.status.kind.eq_ignore_ascii_case("UP");
    RealmStatus {
        realm_id: realm.id,
        online,
        status: connected
            .status
            .name
            .unwrap_or_else(|| if online { "Up" } else { "Down" }.to_string()),
        population,
        has_queue: connected.has_queue,
        timezone: realm.timezone,
        locale: realm.locale,
    }
}
