use std::error::Error as StdError;
use std::fmt::Debug;

use streamcat_changelog::ChangelogError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error<D, S>
where
    D: Debug + StdError + Send + Sync + 'static,
    S: Debug + StdError + Send + Sync + 'static,
{
    /// Failed to decode a stored record.
    #[error("failed to decode record: {0}")]
    Decode(#[source] D),

    /// Failed to encode a record for publishing.
    #[error("failed to encode record: {0}")]
    Encode(#[source] S),

    /// The publish was based on a stale read of the key.
    #[error("version conflict for key {key}: expected {expected}, current {current}")]
    VersionConflict {
        /// The key being published.
        key: String,

        /// The version the publisher read.
        expected: u64,

        /// The version actually stored.
        current: u64,
    },
}

impl<D, S> ChangelogError for Error<D, S>
where
    D: Debug + StdError + Send + Sync + 'static,
    S: Debug + StdError + Send + Sync + 'static,
{
}
