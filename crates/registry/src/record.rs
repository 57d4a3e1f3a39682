use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Actor, OperationType};

/// Free-form stream labels.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Tags {
    /// Profile selector used to resolve the supported region set. Absent,
    /// blank, or placeholder values fall back to the primary profile.
    pub hint: Option<String>,

    /// Additional labels carried through unmodified.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Naming and partitioning parameters used to derive per-region topics.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TopicConfig {
    /// Partition count for derived topics.
    pub partitions: u32,

    /// Replication factor for derived topics.
    pub replication_factor: u32,

    /// Pass-through topic properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// A full stream record: the unit of every changelog write.
///
/// The record is owned by the changelog; mutations clone it, edit the
/// clone, and republish it whole. It is never partially updated.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StreamRecord {
    /// Unique stream name; the changelog key.
    pub name: String,

    /// Stream labels, including the optional region-profile hint.
    pub tags: Tags,

    /// Parameters for per-region topic derivation.
    pub topic_config: TopicConfig,

    /// The last operation applied to the record.
    pub operation_type: OperationType,

    /// Producers registered on the stream. Managed by the stream-level
    /// flows; carried whole through consumer mutations.
    pub producers: Vec<Actor>,

    /// Consumers registered on the stream.
    pub consumers: Vec<Actor>,

    /// When the record was last republished.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Bytes> for StreamRecord {
    type Error = ciborium::de::Error<std::io::Error>;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let reader = bytes.as_ref();
        ciborium::de::from_reader(reader)
    }
}

impl TryInto<Bytes> for StreamRecord {
    type Error = ciborium::ser::Error<std::io::Error>;

    fn try_into(self) -> Result<Bytes, Self::Error> {
        let mut writer = Vec::new();
        ciborium::ser::into_writer(&self, &mut writer)?;
        Ok(Bytes::from(writer))
    }
}
