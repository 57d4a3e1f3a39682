//! In-memory (single node) implementation of the stream-record changelog
//! for local development.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use streamcat_changelog::{Changelog, Versioned};
use tokio::sync::{Mutex, watch};
use tracing::debug;

/// A single appended changelog entry, as observed by followers.
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// Global sequence number, monotonically increasing from one.
    pub seq: u64,

    /// The key the record was published under.
    pub key: String,

    /// The encoded record payload.
    pub payload: Bytes,
}

struct Inner {
    entries: Vec<LogEntry>,
    latest: HashMap<String, (Bytes, u64)>,
}

/// In-memory changelog. Stores encoded payloads in publish order together
/// with a latest-by-key index, and tracks a per-key version for optimistic
/// concurrency checks.
pub struct MemoryChangelog<T, D, S> {
    head: Arc<watch::Sender<u64>>,
    inner: Arc<Mutex<Inner>>,
    _marker: PhantomData<(T, D, S)>,
}

impl<T, D, S> MemoryChangelog<T, D, S> {
    /// Creates a new, empty `MemoryChangelog`.
    #[must_use]
    pub fn new() -> Self {
        let (head, _) = watch::channel(0);

        Self {
            head: Arc::new(head),
            inner: Arc::new(Mutex::new(Inner {
                entries: Vec::new(),
                latest: HashMap::new(),
            })),
            _marker: PhantomData,
        }
    }

    /// Returns the entries appended after global sequence `seq`, oldest
    /// first.
    pub async fn entries_after(&self, seq: u64) -> Vec<LogEntry> {
        let inner = self.inner.lock().await;

        inner
            .entries
            .iter()
            .filter(|entry| entry.seq > seq)
            .cloned()
            .collect()
    }

    /// Returns a receiver that observes the global head sequence as it
    /// advances.
    #[must_use]
    pub fn watch_head(&self) -> watch::Receiver<u64> {
        self.head.subscribe()
    }
}

impl<T, D, S> Default for MemoryChangelog<T, D, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D, S> Clone for MemoryChangelog<T, D, S> {
    fn clone(&self) -> Self {
        Self {
            head: Arc::clone(&self.head),
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, D, S> Changelog<T, D, S> for MemoryChangelog<T, D, S>
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
    type Error = Error<D, S>;

    async fn latest(&self, key: &str) -> Result<Option<Versioned<T>>, Self::Error> {
        let inner = self.inner.lock().await;

        match inner.latest.get(key) {
            Some((payload, version)) => {
                let record = T::try_from(payload.clone()).map_err(Error::Decode)?;

                Ok(Some(Versioned {
                    record,
                    version: *version,
                }))
            }
            None => Ok(None),
        }
    }

    async fn publish(
        &self,
        key: String,
        record: T,
        expected_version: u64,
    ) -> Result<u64, Self::Error> {
        let payload: Bytes = record.try_into().map_err(Error::Encode)?;

        let mut inner = self.inner.lock().await;

        let current = inner.latest.get(&key).map_or(0, |(_, version)| *version);
        if current != expected_version {
            return Err(Error::VersionConflict {
                key,
                expected: expected_version,
                current,
            });
        }

        let version = current + 1;
        let seq = inner.entries.len() as u64 + 1;

        inner.entries.push(LogEntry {
            seq,
            key: key.clone(),
            payload: payload.clone(),
        });
        inner.latest.insert(key.clone(), (payload, version));

        drop(inner);

        self.head.send_replace(seq);

        debug!(%key, seq, version, "record published");

        Ok(version)
    }
}
