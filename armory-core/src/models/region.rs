//! Region routing.
//!
//! This module maps a configured region code to the API host, OAuth host
//! and default locale for that region:
//! - [`Region`] - Supported API regions
//! - [`RegionEndpoints`] - Resolved hosts and locale
//! - [`resolve_host`] - Pure lookup from a region code

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::CoreError;

// ============================================================================
// Region
// ============================================================================

/// Supported API regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Americas and Oceania.
    Us,
    /// Europe.
    Eu,
    /// Korea.
    Kr,
    /// Taiwan.
    Tw,
    /// Mainland China (separate gateway).
    Cn,
}

impl Region {
    /// Returns the lowercase region code used in hosts and namespaces.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Us => "us",
            Self::Eu => "eu",
            Self::Kr => "kr",
            Self::Tw => "tw",
            Self::Cn => "cn",
        }
    }

    /// Returns the default locale for this region.
    pub fn locale(&self) -> &'static str {
        match self {
            Self::Us => "en_US",
            Self::Eu => "en_GB",
            Self::Kr => "ko_KR",
            Self::Tw => "zh_TW",
            Self::Cn => "zh_CN",
        }
    }

    /// Namespace for character profile resources (e.g. `profile-us`).
    pub fn profile_namespace(&self) -> String {
        format!("profile-{}", self.code())
    }

    /// Namespace for dynamic game data such as realm status (e.g. `dynamic-eu`).
    pub fn dynamic_namespace(&self) -> String {
        format!("dynamic-{}", self.code())
    }

    /// Returns the production endpoints for this region.
    pub fn endpoints(&self) -> RegionEndpoints {
        let (api_base, oauth_token_url) = match self {
            Self::Cn => (
                "https://gateway.battlenet.com.cn".to_string(),
                "https://www.battlenet.com.cn/oauth/token".to_string(),
            ),
            other => (
                format!("https://{}.api.blizzard.com", other.code()),
                format!("https://{}.battle.net/oauth/token", other.code()),
            ),
        };

        RegionEndpoints {
            api_base,
            oauth_token_url,
            locale: self.locale().to_string(),
        }
    }

    /// Returns all supported regions.
    pub fn all() -> &'static [Region] {
        &[Self::Us, Self::Eu, Self::Kr, Self::Tw, Self::Cn]
    }
}

impl FromStr for Region {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Self::Us),
            "eu" => Ok(Self::Eu),
            "kr" => Ok(Self::Kr),
            "tw" => Ok(Self::Tw),
            "cn" => Ok(Self::Cn),
            _ => Err(CoreError::UnknownRegion(s.to_string())),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code().to_ascii_uppercase())
    }
}

// ============================================================================
// Region Endpoints
// ============================================================================

/// Resolved endpoints for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEndpoints {
    /// Base URL of the REST API (scheme + host, no trailing slash).
    pub api_base: String,
    /// Full URL of the OAuth token endpoint.
    pub oauth_token_url: String,
    /// Locale sent with every API request.
    pub locale: String,
}

impl RegionEndpoints {
    /// Creates endpoints that point somewhere other than the production hosts.
    pub fn custom(
        api_base: impl Into<String>,
        oauth_token_url: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        let api_base: String = api_base.into();
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            oauth_token_url: oauth_token_url.into(),
            locale: locale.into(),
        }
    }

    /// Host name of the REST API.
    pub fn api_host(&self) -> Option<String> {
        host_of(&self.api_base)
    }

    /// Host name of the OAuth server.
    pub fn oauth_host(&self) -> Option<String> {
        host_of(&self.oauth_token_url)
    }

    /// Joins an API path onto the base URL.
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base, path)
        } else {
            format!("{}/{}", self.api_base, path)
        }
    }
}

fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Resolves a region code (case-insensitive) to its endpoints.
///
/// # Errors
///
/// Returns [`CoreError::UnknownRegion`] for codes outside `US`, `EU`, `KR`,
/// `TW` and `CN`.
pub fn resolve_host(region_code: &str) -> Result<RegionEndpoints, CoreError> {
    let region: Region = region_code.parse()?;
    Ok(region.endpoints())
}

// ============================================================================
// Tests
// ============================================================================
