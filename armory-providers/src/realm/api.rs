//! Realm API response types.

use serde::Deserialize;

use crate::resource::TypedRef;

/// Response of `/data/wow/realm/{slug}`.
#[derive(Debug, Deserialize)]
pub struct RealmResponse {
    /// Realm id (required).
    pub id: i64,
    /// Link to the connected realm group.
    #[serde(default)]
    pub connected_realm: Option<Link>,
    /// IANA timezone.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Realm locale, e.g. `enUS`.
    #[serde(default)]
    pub locale: Option<String>,
}

/// A `{ "href": ... }` link.
#[derive(Debug, Deserialize)]
pub struct Link {
    /// Absolute URL.
    pub href: String,
}

/// Response of `/data/wow/connected-realm/{id}`.
#[derive(Debug, Deserialize)]
pub struct ConnectedRealmResponse {
    /// Status (required, `type` is `UP` or `DOWN`).
    pub status: RealmStatusRef,
    /// Population bucket.
    #[serde(default)]
    pub population: TypedRef,
    /// Whether logins are queued.
    #[serde(default)]
    pub has_queue: bool,
}

/// The connected realm's status field.
#[derive(Debug, Deserialize)]
pub struct RealmStatusRef {
    /// Machine-readable status.
    #[serde(rename = "type")]
    pub kind: String,
    /// Localized status name.
    #[serde(default)]
    pub name: Option<String>,
}
