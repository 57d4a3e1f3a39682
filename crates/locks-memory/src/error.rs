use streamcat_locks::LockManagerError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("lock error")]
pub struct Error;

impl LockManagerError for Error {}
