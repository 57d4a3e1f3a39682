use std::error::Error as StdError;
use std::fmt::Debug;

use streamcat_projection::ProjectionError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error<D>
where
    D: Debug + StdError + Send + Sync + 'static,
{
    /// Failed to decode a changelog entry while catching up.
    #[error("failed to decode changelog entry: {0}")]
    Decode(#[source] D),
}

impl<D> ProjectionError for Error<D> where D: Debug + StdError + Send + Sync + 'static {}
