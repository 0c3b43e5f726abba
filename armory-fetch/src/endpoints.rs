//! Endpoint lookup with per-region overrides.

use std::collections::HashMap;

use armory_core::{Region, RegionEndpoints};

/// Resolves the endpoints for a region.
///
/// Overrides (test servers, proxies) win over the production table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointTable {
    overrides: HashMap<Region, RegionEndpoints>,
}

impl EndpointTable {
    /// Creates a table with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an override for one region.
    pub fn with_override(mut self, region: Region, endpoints: RegionEndpoints) -> Self {
        self.overrides.insert(region, endpoints);
        self
    }

    /// Returns the endpoints to use for `region`.
    pub fn resolve(&self, region: Region) -> RegionEndpoints {
        self.overrides
            .get(&region)
            .cloned()
            .unwrap_or_else(|| region.endpoints())
    }

    /// Returns true if `region` is overridden.
    pub fn is_overridden(&self, region: Region) -> bool {
        self.overrides.contains_key(&region)
    }
}
