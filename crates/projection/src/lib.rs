//! Abstract interface for the locally materialized view of changelog
//! state.
//!
//! A projection is an eventually consistent, read-optimized copy built by
//! continuously consuming the changelog. Lookups never touch the log, and
//! no ordering is guaranteed between a publish and a subsequent lookup on
//! any instance, including the publisher's own.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

/// Marker trait for projection errors
pub trait ProjectionError: Debug + Error + Send + Sync + 'static {}

/// A trait representing a local materialized view over changelog records.
#[async_trait]
pub trait Projection<T, D, S>
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
    /// The error type for projection operations.
    type Error: ProjectionError;

    /// Point lookup of the latest locally observed record for `key`.
    async fn lookup(&self, key: &str) -> Result<Option<T>, Self::Error>;

    /// The global changelog sequence this view has applied up to.
    async fn last_seq(&self) -> Result<u64, Self::Error>;
}
