//! In-memory (single process) implementation of keyed locks for local
//! development.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use streamcat_locks::LockManager;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-memory keyed lock manager.
#[derive(Clone, Debug, Default)]
pub struct MemoryLockManager {
    slots: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl MemoryLockManager {
    /// Creates a new `MemoryLockManager`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn slot(&self, resource_id: &str) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(resource_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    type Error = Error;
    type Guard = OwnedMutexGuard<()>;

    async fn lock(&self, resource_id: String) -> Result<Self::Guard, Self::Error> {
        let slot = self.slot(&resource_id).await;

        Ok(slot.lock_owned().await)
    }

    async fn try_lock(&self, resource_id: String) -> Result<Option<Self::Guard>, Self::Error> {
        let slot = self.slot(&resource_id).await;

        Ok(slot.try_lock_owned().ok())
    }
}
