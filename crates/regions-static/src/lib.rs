//! Static region catalog resolved from configuration, for deployments
//! whose region profiles are fixed and for local development.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use streamcat_regions::RegionCatalog;

/// Configuration for the static region catalog, mapping each hint to the
/// set of regions it supports.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegionCatalogConfig {
    /// Supported regions keyed by hint.
    pub hints: HashMap<String, BTreeSet<String>>,
}

/// Region catalog backed by a fixed configuration map. Hints absent from
/// the configuration resolve to the empty region set.
#[derive(Clone, Debug, Default)]
pub struct StaticRegionCatalog {
    hints: Arc<HashMap<String, BTreeSet<String>>>,
}

impl StaticRegionCatalog {
    /// Creates a catalog from configuration.
    #[must_use]
    pub fn new(config: RegionCatalogConfig) -> Self {
        Self {
            hints: Arc::new(config.hints),
        }
    }
}

#[async_trait]
impl RegionCatalog for StaticRegionCatalog {
    type Error = Error;

    async fn supported_regions(&self, hint: &str) -> Result<BTreeSet<String>, Self::Error> {
        Ok(self.hints.get(hint).cloned().unwrap_or_default())
    }

    async fn is_supported(&self, hint: &str, region: &str) -> Result<bool, Self::Error> {
        Ok(self
            .hints
            .get(hint)
            .is_some_and(|regions| regions.contains(region)))
    }
}
