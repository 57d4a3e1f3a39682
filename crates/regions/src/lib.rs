//! Abstract interface for resolving the regions a stream hint supports.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;

/// Marker trait for `RegionCatalog` errors
pub trait RegionCatalogError: Debug + Error + Send + Sync + 'static {}

/// A trait representing a catalog of supported regions, keyed by the hint
/// a stream uses to select its region profile.
#[async_trait]
pub trait RegionCatalog: Clone + Send + Sync + 'static {
    /// The error type for catalog operations.
    type Error: RegionCatalogError;

    /// Returns the set of regions supported for `hint`.
    async fn supported_regions(&self, hint: &str) -> Result<BTreeSet<String>, Self::Error>;

    /// Returns whether `region` is supported for `hint`.
    async fn is_supported(&self, hint: &str, region: &str) -> Result<bool, Self::Error>;
}
