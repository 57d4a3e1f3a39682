//! In-memory materialized view following the memory changelog, for local
//! development.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use streamcat_changelog_memory::MemoryChangelog;
use streamcat_projection::Projection;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::warn;

/// In-memory view over a [`MemoryChangelog`].
///
/// The view observes nothing on its own: entries are applied either by an
/// explicit [`catch_up`](Self::catch_up) (deterministic, for tests) or by
/// the follower task spawned with [`start`](Self::start). Until one of
/// those runs, lookups serve whatever was last applied.
pub struct MemoryProjection<T, D, S> {
    changelog: MemoryChangelog<T, D, S>,
    cursor: Arc<Mutex<u64>>,
    state: Arc<RwLock<HashMap<String, T>>>,
}

impl<T, D, S> MemoryProjection<T, D, S>
where
    T: Clone
        + Debug
        + Send
        + Sync
        + TryFrom<Bytes, Error = D>
        + TryInto<Bytes, Error = S>
        + 'static,
    D: Debug + StdError + Send + Sync + 'static,
    S: Debug + StdError + Send + Sync + 'static,
{
    /// Creates a view over `changelog`, positioned before its first entry.
    #[must_use]
    pub fn new(changelog: MemoryChangelog<T, D, S>) -> Self {
        Self {
            changelog,
            cursor: Arc::new(Mutex::new(0)),
            state: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Applies every changelog entry past the cursor and returns the new
    /// cursor position.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored payload fails to decode; entries
    /// before the failing one stay applied.
    pub async fn catch_up(&self) -> Result<u64, Error<D>> {
        let mut cursor = self.cursor.lock().await;

        for entry in self.changelog.entries_after(*cursor).await {
            let record = T::try_from(entry.payload).map_err(Error::Decode)?;

            self.state.write().await.insert(entry.key, record);
            *cursor = entry.seq;
        }

        Ok(*cursor)
    }

    /// Spawns the follower task that applies entries as they are
    /// published. Runs until aborted via the returned handle.
    #[must_use]
    pub fn start(&self) -> JoinHandle<()> {
        let view = self.clone();
        let mut head = self.changelog.watch_head();

        tokio::spawn(async move {
            loop {
                if let Err(error) = view.catch_up().await {
                    warn!(%error, "failed to apply changelog entries");
                }

                if head.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

impl<T, D, S> Clone for MemoryProjection<T, D, S> {
    fn clone(&self) -> Self {
        Self {
            changelog: self.changelog.clone(),
            cursor: Arc::clone(&self.cursor),
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl<T, D, S> Projection<T, D, S> for MemoryProjection<T, D, S>
where
    T: Clone
        + Debug
        + Send
        + Sync
        + TryFrom<Bytes, Error = D>
        + TryInto<Bytes, Error = S>
        + 'static,
    D: Debug + StdError + Send + Sync + 'static,
    S: Debug + StdError + Send + Sync + 'static,
{
    type Error = Error<D>;

    async fn lookup(&self, key: &str) -> Result<Option<T>, Self::Error> {
        Ok(self.state.read().await.get(key).cloned())
    }

    async fn last_seq(&self) -> Result<u64, Self::Error> {
        Ok(*self.cursor.lock().await)
    }
}
