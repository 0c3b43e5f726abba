//! Realm status (ServerStatus tier).
//!
//! Requests `/data/wow/realm/{slug}` for the realm id, timezone and locale,
//! then `/data/wow/connected-realm/{id}` for status, population and queue.
//! Both use the region's dynamic namespace.

mod api;
mod fetcher;
pub(crate) mod parser;

pub use api::{ConnectedRealmResponse, RealmResponse};
pub use fetcher::RealmFetcher;
pub use parser::{RealmStatus, connected_realm_id, parse_realm_status};
