//! Abstract interface for the durable stream-record changelog.
//!
//! The changelog is the append-based record of all stream mutations and
//! the single source of truth: every write republishes a full record under
//! its key, and read-optimized views are derived by consuming the log.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

/// Marker trait for changelog errors
pub trait ChangelogError: Debug + Error + Send + Sync + 'static {}

/// A record read from the changelog, paired with the number of times its
/// key has been published.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Versioned<T> {
    /// The latest record for the key.
    pub record: T,

    /// The per-key publish count as of this record.
    pub version: u64,
}

/// A trait representing the durable, ordered, per-key changelog of stream
/// records.
#[async_trait]
pub trait Changelog<T, D, S>
where
    Self: Clone + Send + Sync + 'static,
    T: Clone
        + Debug
        + Send
        + Sync
        + TryFrom<Bytes, Error = D>
        + TryInto<Bytes, Error = S>
        + 'static,
    D: Debug + Error + Send + Sync + 'static,
    S: Debug + Error + Send + Sync + 'static,
{
    /// The error type for changelog operations.
    type Error: ChangelogError;

    /// Returns the latest record published for `key`, if any.
    async fn latest(&self, key: &str) -> Result<Option<Versioned<T>>, Self::Error>;

    /// Appends `record` as the new latest value for `key` and returns the
    /// new version.
    ///
    /// `expected_version` must equal the version of the current latest
    /// record for `key` (zero when the key is absent); a publish based on
    /// a stale read is rejected.
    async fn publish(
        &self,
        key: String,
        record: T,
        expected_version: u64,
    ) -> Result<u64, Self::Error>;
}
