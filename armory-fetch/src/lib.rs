// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Armory Watch Fetch
//!
//! HTTP infrastructure for talking to the game-data API.
//!
//! ## Credentials
//!
//! - [`credentials::CredentialManager`] - One cached OAuth token per region, single-flight refresh
//! - [`credentials::TokenSource`] - Trait seam for token providers
//!
//! ## Request Execution
//!
//! - [`executor::RequestExecutor`] - Bearer auth, locale, status policy
//! - [`rate_limit::RegionLimiters`] - Shared multi-quota token bucket per region
//! - [`retry::RetryPolicy`] - Retry budgets with jittered, monotonic backoff
//! - [`endpoints::EndpointTable`] - Production hosts with per-region overrides
//!
//! ## Context
//!
//! - [`context::FetchContext`] - What every resource fetcher receives
//!
//! ## Example
//!
//! ```ignore
//! use armory_fetch::{ClientCredentials, FetchContext, FetchSettings};
//!
//! let ctx = FetchContext::new(ClientCredentials::new(id, secret), FetchSettings::default())?;
//! let response = ctx
//!     .get(Region::Us, "/profile/wow/character/stormrage/thrall", &[("namespace", "profile-us")])
//!     .await?;
//! ```

pub mod context;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod rate_limit;
pub mod retry;

// Re-export key types at crate root

// Errors
pub use error::FetchError;

// Credentials
pub use credentials::{AccessToken, ClientCredentials, CredentialManager, TokenSource};

// Execution
pub use endpoints::EndpointTable;
pub use executor::{RawResponse, RequestExecutor};
pub use rate_limit::{Quota, RateLimiter, RegionLimiters};
pub use retry::{Backoff, RetryPolicy};

// Context
pub use context::{FetchContext, FetchContextBuilder, FetchSettings, GameSettings};
