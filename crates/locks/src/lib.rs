//! Abstract interface for keyed mutual exclusion.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;

/// Marker trait for `LockManager` errors
pub trait LockManagerError: Debug + Error + Send + Sync + 'static {}

/// A trait representing a keyed lock manager with asynchronous operations.
/// Locks are represented by a guard type that releases the lock when
/// dropped; holders of locks for different keys never contend.
#[async_trait]
pub trait LockManager: Clone + Send + Sync + 'static {
    /// The error type for lock operations.
    type Error: LockManagerError;

    /// The guard type that releases the lock on drop.
    type Guard: Send + 'static;

    /// Acquires the lock for a resource, waiting until it becomes
    /// available.
    ///
    /// # Arguments
    /// * `resource_id`: A unique identifier for the resource to be locked.
    async fn lock(&self, resource_id: String) -> Result<Self::Guard, Self::Error>;

    /// Attempts to acquire the lock for a resource without waiting.
    ///
    /// If the lock is acquired successfully, returns `Ok(Some(Guard))`.
    /// If the lock is currently held elsewhere, returns `Ok(None)`.
    ///
    /// # Arguments
    /// * `resource_id`: A unique identifier for the resource to be locked.
    async fn try_lock(&self, resource_id: String) -> Result<Option<Self::Guard>, Self::Error>;
}
