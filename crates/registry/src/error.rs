use streamcat_changelog::ChangelogError;
use streamcat_locks::LockManagerError;
use streamcat_projection::ProjectionError;
use streamcat_regions::RegionCatalogError;
use thiserror::Error;

/// Errors that can occur in this crate.
///
/// The first three variants are deterministic precondition failures and
/// are never retried; none of them is raised after a publish, so a failed
/// mutation leaves no partial write. The pass-through variants carry
/// collaborator failures unchanged; retry policy for those belongs to the
/// caller.
#[derive(Debug, Error)]
pub enum Error<CE, PE, LE, RE>
where
    CE: ChangelogError,
    PE: ProjectionError,
    LE: LockManagerError,
    RE: RegionCatalogError,
{
    /// A mutation targeted a stream absent from the authoritative store.
    #[error("stream not found: {stream}")]
    StreamNotFound {
        /// The requested stream name.
        stream: String,
    },

    /// A delete targeted a consumer with no registration on the stream.
    #[error("consumer not found: {consumer}")]
    ConsumerNotFound {
        /// The requested consumer name.
        consumer: String,
    },

    /// A registration requested a region outside the supported set
    /// resolved from the stream's hint.
    #[error("unknown region {region} for hint {hint}")]
    UnknownRegion {
        /// The requested region.
        region: String,

        /// The resolved hint the region was validated against.
        hint: String,
    },

    /// Errors passed through from the underlying changelog.
    #[error(transparent)]
    Changelog(CE),

    /// Errors passed through from the underlying projection.
    #[error(transparent)]
    Projection(PE),

    /// Errors passed through from the underlying lock manager.
    #[error(transparent)]
    Lock(LE),

    /// Errors passed through from the underlying region catalog.
    #[error(transparent)]
    Regions(RE),
}
