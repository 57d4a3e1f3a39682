use streamcat_regions::RegionCatalogError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("region catalog error")]
pub struct Error;

impl RegionCatalogError for Error {}
