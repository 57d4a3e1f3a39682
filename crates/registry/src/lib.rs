//! Consumer lifecycle management for the stream registry.
//!
//! Mutations read the authoritative stream record from the changelog,
//! apply in-memory edits to its consumer list, and republish the whole
//! record; the local projection observes the publish later, out of band.
//! Pure reads consult only the projection, so read-after-write is not
//! guaranteed, even on the instance that just published.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod actor;
mod derivation;
mod error;
mod operation;
mod record;

pub use actor::{Actor, RegionStreamConfiguration};
pub use derivation::{
    CONSUMER_ACTOR_TYPE, CONSUMER_TOPIC_SUFFIXES, PRIMARY_HINT, derive_actor_config, resolve_hint,
};
pub use error::Error;
pub use operation::OperationType;
pub use record::{StreamRecord, Tags, TopicConfig};

use async_trait::async_trait;
use chrono::Utc;
use streamcat_changelog::{Changelog, Versioned};
use streamcat_locks::LockManager;
use streamcat_projection::Projection;
use streamcat_regions::RegionCatalog;
use tracing::{debug, info};

type DeserializeError = ciborium::de::Error<std::io::Error>;
type SerializeError = ciborium::ser::Error<std::io::Error>;

/// Trait for managing consumer registrations on streams.
#[async_trait]
pub trait ConsumerLifecycle
where
    Self: Clone + Send + Sync + 'static,
{
    /// The error type for lifecycle operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Idempotent upsert of a consumer's registration for one region.
    ///
    /// Returns `Ok(None)` when the stream is not registered. A consumer
    /// already registered for the region has its configuration
    /// regenerated wholesale; a consumer registered for other regions
    /// gains a configuration for this one; an unknown consumer is
    /// appended to the stream.
    async fn update(
        &self,
        stream_name: &str,
        consumer_name: &str,
        region: &str,
    ) -> Result<Option<Actor>, Self::Error>;

    /// Point read of a consumer from the local view. Never touches the
    /// changelog.
    async fn get(
        &self,
        stream_name: &str,
        consumer_name: &str,
    ) -> Result<Option<Actor>, Self::Error>;

    /// All consumers attached to the stream, in stored order. Returns an
    /// empty list when the stream is absent or has no consumers.
    async fn get_all(&self, stream_name: &str) -> Result<Vec<Actor>, Self::Error>;

    /// Removes a consumer and all of its region registrations from the
    /// authoritative record.
    async fn delete(&self, stream_name: &str, consumer_name: &str) -> Result<(), Self::Error>;
}

/// How an update call relates to the record's existing consumer list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MergeTarget {
    /// The consumer is registered and already has a configuration for the
    /// requested region.
    ExistingRegionMatch { actor: usize },

    /// The consumer is registered but has no configuration for the
    /// requested region.
    ExistingActorNewRegion { actor: usize },

    /// No consumer with the name is registered.
    NewActor,
}

fn classify(consumers: &[Actor], consumer_name: &str, region: &str) -> MergeTarget {
    match consumers
        .iter()
        .position(|actor| actor.name_matches(consumer_name))
    {
        Some(actor) if consumers[actor].region_configuration(region).is_some() => {
            MergeTarget::ExistingRegionMatch { actor }
        }
        Some(actor) => MergeTarget::ExistingActorNewRegion { actor },
        None => MergeTarget::NewActor,
    }
}

/// Orchestrates consumer create/update/get/delete against the changelog
/// (writes) and the local projection (reads).
///
/// Mutations for the same stream name are serialized behind the lock
/// manager for the whole read-merge-publish cycle; mutations for
/// different names never contend. The published record additionally
/// carries the version the read observed, so a shared changelog can
/// reject lost updates from other instances.
#[derive(Clone)]
pub struct ConsumerLifecycleManager<C, P, L, R>
where
    C: Changelog<StreamRecord, DeserializeError, SerializeError>,
    P: Projection<StreamRecord, DeserializeError, SerializeError>,
    L: LockManager,
    R: RegionCatalog,
{
    changelog: C,
    locks: L,
    projection: P,
    regions: R,
}

impl<C, P, L, R> ConsumerLifecycleManager<C, P, L, R>
where
    C: Changelog<StreamRecord, DeserializeError, SerializeError>,
    P: Projection<StreamRecord, DeserializeError, SerializeError>,
    L: LockManager,
    R: RegionCatalog,
{
    /// Creates a new manager over the four collaborators.
    pub fn new(changelog: C, projection: P, locks: L, regions: R) -> Self {
        Self {
            changelog,
            locks,
            projection,
            regions,
        }
    }

    async fn update_consumer(
        &self,
        stream_name: &str,
        consumer_name: &str,
        region: &str,
    ) -> Result<Option<Actor>, Error<C::Error, P::Error, L::Error, R::Error>> {
        let _guard = self
            .locks
            .lock(stream_name.to_string())
            .await
            .map_err(Error::Lock)?;

        let Some(Versioned {
            mut record,
            version,
        }) = self
            .changelog
            .latest(stream_name)
            .await
            .map_err(Error::Changelog)?
        else {
            debug!(
                stream = stream_name,
                consumer = consumer_name,
                "update targeted an unregistered stream"
            );
            return Ok(None);
        };

        let hint = resolve_hint(record.tags.hint.as_deref());

        match classify(&record.consumers, consumer_name, region) {
            MergeTarget::ExistingRegionMatch { actor } => {
                // The region was validated when first registered; it is
                // deliberately not re-validated here, so a catalog that
                // later shrinks cannot break an existing registration.
                let regenerated = derive_actor_config(
                    stream_name,
                    region,
                    &record.consumers[actor],
                    OperationType::Update,
                    CONSUMER_TOPIC_SUFFIXES,
                    &hint,
                    CONSUMER_ACTOR_TYPE,
                    &record.topic_config,
                );
                record.consumers[actor] = regenerated.clone();

                self.republish(record, version, OperationType::Update)
                    .await?;
                info!(
                    stream = stream_name,
                    consumer = consumer_name,
                    region,
                    "consumer configuration regenerated"
                );

                Ok(Some(regenerated))
            }
            MergeTarget::ExistingActorNewRegion { actor } => {
                self.ensure_region_supported(&hint, region).await?;

                let extended = derive_actor_config(
                    stream_name,
                    region,
                    &record.consumers[actor],
                    OperationType::Update,
                    CONSUMER_TOPIC_SUFFIXES,
                    &hint,
                    CONSUMER_ACTOR_TYPE,
                    &record.topic_config,
                );
                record.consumers[actor] = extended.clone();

                self.republish(record, version, OperationType::Update)
                    .await?;
                info!(
                    stream = stream_name,
                    consumer = consumer_name,
                    region,
                    "consumer registered in additional region"
                );

                Ok(Some(extended))
            }
            MergeTarget::NewActor => self
                .create_consumer(record, version, consumer_name, region, &hint)
                .await
                .map(Some),
        }
    }

    async fn create_consumer(
        &self,
        mut record: StreamRecord,
        version: u64,
        consumer_name: &str,
        region: &str,
        hint: &str,
    ) -> Result<Actor, Error<C::Error, P::Error, L::Error, R::Error>> {
        self.ensure_region_supported(hint, region).await?;

        let stream_name = record.name.clone();
        let configured = derive_actor_config(
            &stream_name,
            region,
            &Actor::new(consumer_name),
            OperationType::Create,
            CONSUMER_TOPIC_SUFFIXES,
            hint,
            CONSUMER_ACTOR_TYPE,
            &record.topic_config,
        );
        record.consumers.push(configured.clone());

        self.republish(record, version, OperationType::Create)
            .await?;
        info!(
            stream = %stream_name,
            consumer = consumer_name,
            region,
            "consumer registered"
        );

        Ok(configured)
    }

    async fn ensure_region_supported(
        &self,
        hint: &str,
        region: &str,
    ) -> Result<(), Error<C::Error, P::Error, L::Error, R::Error>> {
        if self
            .regions
            .is_supported(hint, region)
            .await
            .map_err(Error::Regions)?
        {
            Ok(())
        } else {
            Err(Error::UnknownRegion {
                region: region.to_string(),
                hint: hint.to_string(),
            })
        }
    }

    async fn republish(
        &self,
        mut record: StreamRecord,
        version: u64,
        operation: OperationType,
    ) -> Result<u64, Error<C::Error, P::Error, L::Error, R::Error>> {
        record.operation_type = operation;
        record.updated_at = Utc::now();

        let key = record.name.clone();
        self.changelog
            .publish(key, record, version)
            .await
            .map_err(Error::Changelog)
    }
}

#[async_trait]
impl<C, P, L, R> ConsumerLifecycle for ConsumerLifecycleManager<C, P, L, R>
where
    C: Changelog<StreamRecord, DeserializeError, SerializeError>,
    P: Projection<StreamRecord, DeserializeError, SerializeError>,
    L: LockManager,
    R: RegionCatalog,
{
    type Error = Error<C::Error, P::Error, L::Error, R::Error>;

    async fn update(
        &self,
        stream_name: &str,
        consumer_name: &str,
        region: &str,
    ) -> Result<Option<Actor>, Self::Error> {
        self.update_consumer(stream_name, consumer_name, region)
            .await
    }

    async fn get(
        &self,
        stream_name: &str,
        consumer_name: &str,
    ) -> Result<Option<Actor>, Self::Error> {
        debug!(
            stream = stream_name,
            consumer = consumer_name,
            "serving consumer from local view"
        );

        let Some(mut record) = self
            .projection
            .lookup(stream_name)
            .await
            .map_err(Error::Projection)?
        else {
            return Ok(None);
        };

        // Informational marker on the local copy; never republished.
        record.operation_type = OperationType::Get;

        Ok(record
            .consumers
            .iter()
            .find(|actor| actor.name_matches(consumer_name))
            .cloned())
    }

    async fn get_all(&self, stream_name: &str) -> Result<Vec<Actor>, Self::Error> {
        debug!(stream = stream_name, "serving consumer list from local view");

        match self
            .projection
            .lookup(stream_name)
            .await
            .map_err(Error::Projection)?
        {
            Some(mut record) => {
                record.operation_type = OperationType::Get;
                Ok(record.consumers)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn delete(&self, stream_name: &str, consumer_name: &str) -> Result<(), Self::Error> {
        let _guard = self
            .locks
            .lock(stream_name.to_string())
            .await
            .map_err(Error::Lock)?;

        let Some(Versioned {
            mut record,
            version,
        }) = self
            .changelog
            .latest(stream_name)
            .await
            .map_err(Error::Changelog)?
        else {
            return Err(Error::StreamNotFound {
                stream: stream_name.to_string(),
            });
        };

        let initial_len = record.consumers.len();
        record
            .consumers
            .retain(|actor| !actor.name_matches(consumer_name));

        if record.consumers.len() == initial_len {
            return Err(Error::ConsumerNotFound {
                consumer: consumer_name.to_string(),
            });
        }

        self.republish(record, version, OperationType::Delete)
            .await?;
        info!(
            stream = stream_name,
            consumer = consumer_name,
            "consumer removed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{BTreeMap, BTreeSet, HashMap};

    use streamcat_changelog_memory::MemoryChangelog;
    use streamcat_locks_memory::MemoryLockManager;
    use streamcat_projection_memory::MemoryProjection;
    use streamcat_regions_static::{RegionCatalogConfig, StaticRegionCatalog};
    use uuid::Uuid;

    type TestChangelog = MemoryChangelog<StreamRecord, DeserializeError, SerializeError>;
    type TestProjection = MemoryProjection<StreamRecord, DeserializeError, SerializeError>;
    type TestManager = ConsumerLifecycleManager<
        TestChangelog,
        TestProjection,
        MemoryLockManager,
        StaticRegionCatalog,
    >;

    fn test_catalog() -> StaticRegionCatalog {
        StaticRegionCatalog::new(RegionCatalogConfig {
            hints: HashMap::from([
                (
                    "primary".to_string(),
                    BTreeSet::from(["us-east-1".to_string(), "eu-west-1".to_string()]),
                ),
                (
                    "aggregate".to_string(),
                    BTreeSet::from(["us-east-1".to_string()]),
                ),
            ]),
        })
    }

    fn test_manager() -> (TestManager, TestChangelog, TestProjection) {
        let changelog = TestChangelog::new();
        let projection = MemoryProjection::new(changelog.clone());
        let manager = ConsumerLifecycleManager::new(
            changelog.clone(),
            projection.clone(),
            MemoryLockManager::new(),
            test_catalog(),
        );

        (manager, changelog, projection)
    }

    fn stream_name() -> String {
        format!("test-stream-{}", Uuid::new_v4())
    }

    fn stream_record(name: &str, hint: Option<&str>) -> StreamRecord {
        StreamRecord {
            name: name.to_string(),
            tags: Tags {
                hint: hint.map(ToString::to_string),
                labels: BTreeMap::new(),
            },
            topic_config: TopicConfig {
                partitions: 4,
                replication_factor: 3,
                properties: BTreeMap::new(),
            },
            operation_type: OperationType::Create,
            producers: vec![Actor::new("ingest")],
            consumers: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    async fn seed_stream(changelog: &TestChangelog, name: &str, hint: Option<&str>) {
        changelog
            .publish(name.to_string(), stream_record(name, hint), 0)
            .await
            .unwrap();
    }

    async fn latest_record(changelog: &TestChangelog, name: &str) -> Versioned<StreamRecord> {
        changelog.latest(name).await.unwrap().unwrap()
    }

    #[test]
    fn test_classify() {
        let mut billing = Actor::new("billing");
        billing.region_configurations.push(RegionStreamConfiguration {
            region: "us-east-1".to_string(),
            topics: Vec::new(),
            properties: BTreeMap::new(),
        });
        let consumers = vec![billing];

        assert_eq!(
            classify(&consumers, "billing", "us-east-1"),
            MergeTarget::ExistingRegionMatch { actor: 0 }
        );
        assert_eq!(
            classify(&consumers, "BILLING", "eu-west-1"),
            MergeTarget::ExistingActorNewRegion { actor: 0 }
        );
        assert_eq!(
            classify(&consumers, "fraud", "us-east-1"),
            MergeTarget::NewActor
        );
    }

    #[tokio::test]
    async fn test_update_registers_new_consumer() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        let registered = manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(registered.name, "billing");
        let configuration = registered.region_configuration("us-east-1").unwrap();
        assert_eq!(
            configuration.topics,
            vec![stream.clone(), format!("{stream}.global")]
        );

        let latest = latest_record(&changelog, &stream).await;
        assert_eq!(latest.version, 2);
        assert_eq!(latest.record.consumers, vec![registered]);
        assert_eq!(latest.record.operation_type, OperationType::Create);
        // Producers ride along untouched on consumer mutations.
        assert_eq!(latest.record.producers, vec![Actor::new("ingest")]);
    }

    #[tokio::test]
    async fn test_repeated_update_is_idempotent() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        let first = manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap()
            .unwrap();
        let second = manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, second);

        let latest = latest_record(&changelog, &stream).await;
        assert_eq!(latest.record.consumers.len(), 1);
        assert_eq!(latest.record.consumers[0].region_configurations.len(), 1);
        assert_eq!(latest.record.operation_type, OperationType::Update);
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_region() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        let result = manager.update(&stream, "billing", "mars").await;

        assert!(matches!(
            result,
            Err(Error::UnknownRegion { ref region, ref hint })
                if region == "mars" && hint == "primary"
        ));

        // The failure must not have published anything.
        let latest = latest_record(&changelog, &stream).await;
        assert_eq!(latest.version, 1);
        assert!(latest.record.consumers.is_empty());
    }

    #[tokio::test]
    async fn test_update_on_missing_stream_returns_none() {
        let (manager, _, _) = test_manager();

        let result = manager
            .update("no-such-stream", "billing", "us-east-1")
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_appends_region_to_existing_actor() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap();
        let extended = manager
            .update(&stream, "billing", "eu-west-1")
            .await
            .unwrap()
            .unwrap();

        let regions: Vec<_> = extended
            .region_configurations
            .iter()
            .map(|configuration| configuration.region.clone())
            .collect();
        assert_eq!(regions, vec!["us-east-1".to_string(), "eu-west-1".to_string()]);

        // One actor entry with two regions, not two entries sharing a
        // name.
        let latest = latest_record(&changelog, &stream).await;
        assert_eq!(latest.record.consumers.len(), 1);
        assert_eq!(latest.record.consumers[0].region_configurations.len(), 2);
    }

    #[tokio::test]
    async fn test_update_matches_names_case_insensitively() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap();
        let matched = manager
            .update(&stream, "BILLING", "us-east-1")
            .await
            .unwrap()
            .unwrap();

        // The original casing survives and no duplicate is created.
        assert_eq!(matched.name, "billing");
        let latest = latest_record(&changelog, &stream).await;
        assert_eq!(latest.record.consumers.len(), 1);
    }

    #[tokio::test]
    async fn test_update_regenerates_drifted_configuration() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        let registered = manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap()
            .unwrap();

        // Corrupt the stored configuration behind the manager's back.
        let Versioned {
            mut record,
            version,
        } = latest_record(&changelog, &stream).await;
        record.consumers[0].region_configurations[0].topics = vec!["drifted".to_string()];
        changelog
            .publish(stream.clone(), record, version)
            .await
            .unwrap();

        let regenerated = manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(regenerated, registered);
    }

    #[tokio::test]
    async fn test_update_respects_stream_hint() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        // Uppercase with stray whitespace; resolution normalizes it.
        seed_stream(&changelog, &stream, Some("AGGREGATE ")).await;

        let result = manager.update(&stream, "billing", "eu-west-1").await;
        assert!(matches!(
            result,
            Err(Error::UnknownRegion { ref hint, .. }) if hint == "aggregate"
        ));

        assert!(
            manager
                .update(&stream, "billing", "us-east-1")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_delete_removes_whole_actor() {
        let (manager, changelog, projection) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap();
        manager
            .update(&stream, "billing", "eu-west-1")
            .await
            .unwrap();

        manager.delete(&stream, "billing").await.unwrap();

        let latest = latest_record(&changelog, &stream).await;
        assert!(latest.record.consumers.is_empty());
        assert_eq!(latest.record.operation_type, OperationType::Delete);

        projection.catch_up().await.unwrap();
        assert!(manager.get(&stream, "billing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_consumer_fails() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap();

        let result = manager.delete(&stream, "ghost").await;

        assert!(matches!(
            result,
            Err(Error::ConsumerNotFound { ref consumer }) if consumer == "ghost"
        ));

        let latest = latest_record(&changelog, &stream).await;
        assert_eq!(latest.record.consumers.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_stream_fails() {
        let (manager, _, _) = test_manager();

        let result = manager.delete("no-such-stream", "billing").await;

        assert!(matches!(
            result,
            Err(Error::StreamNotFound { ref stream }) if stream == "no-such-stream"
        ));
    }

    #[tokio::test]
    async fn test_reads_lag_behind_acknowledged_publishes() {
        let (manager, changelog, projection) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;
        projection.catch_up().await.unwrap();

        manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap();

        // The publish is acknowledged, but this projection has not
        // observed it: the read serves the pre-update record.
        assert!(manager.get(&stream, "billing").await.unwrap().is_none());
        assert!(manager.get_all(&stream).await.unwrap().is_empty());

        projection.catch_up().await.unwrap();
        assert!(manager.get(&stream, "billing").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_matches_names_case_insensitively() {
        let (manager, changelog, projection) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap();
        projection.catch_up().await.unwrap();

        let fetched = manager.get(&stream, "Billing").await.unwrap().unwrap();
        assert_eq!(fetched.name, "billing");
    }

    #[tokio::test]
    async fn test_get_all_missing_stream_returns_empty() {
        let (manager, _, _) = test_manager();

        assert!(manager.get_all("no-such-stream").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_returns_stored_order() {
        let (manager, changelog, projection) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        manager
            .update(&stream, "billing", "us-east-1")
            .await
            .unwrap();
        manager.update(&stream, "fraud", "eu-west-1").await.unwrap();
        projection.catch_up().await.unwrap();

        let names: Vec<_> = manager
            .get_all(&stream)
            .await
            .unwrap()
            .into_iter()
            .map(|actor| actor.name)
            .collect();

        assert_eq!(names, vec!["billing".to_string(), "fraud".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_serialize_per_stream() {
        let (manager, changelog, _) = test_manager();
        let stream = stream_name();
        seed_stream(&changelog, &stream, None).await;

        let handles: Vec<_> = (0..5)
            .map(|index| {
                let manager = manager.clone();
                let stream = stream.clone();
                tokio::spawn(async move {
                    manager
                        .update(&stream, &format!("consumer-{index}"), "us-east-1")
                        .await
                })
            })
            .collect();

        let results = futures::future::try_join_all(handles).await.unwrap();
        assert!(results.into_iter().all(|result| result.is_ok()));

        // Every mutation landed; none was lost to a stale republish.
        let latest = latest_record(&changelog, &stream).await;
        assert_eq!(latest.version, 6);
        assert_eq!(latest.record.consumers.len(), 5);
    }
}
