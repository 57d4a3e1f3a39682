use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A registered producer or consumer of a stream.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Actor {
    /// Logical identity; unique within a stream's consumer list under
    /// case-insensitive comparison.
    pub name: String,

    /// Per-region derived settings, one entry per registered region.
    pub region_configurations: Vec<RegionStreamConfiguration>,
}

impl Actor {
    /// Creates an actor with no region registrations.
    #[must_use]
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            region_configurations: Vec::new(),
        }
    }

    /// Whether this actor's name matches `name` case-insensitively.
    #[must_use]
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// The configuration registered for `region`, if any.
    #[must_use]
    pub fn region_configuration(&self, region: &str) -> Option<&RegionStreamConfiguration> {
        self.region_configurations
            .iter()
            .find(|configuration| configuration.region == region)
    }
}

/// An actor's derived settings for one region.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RegionStreamConfiguration {
    /// Region identifier; a member of the stream hint's supported set at
    /// the time the configuration was written.
    pub region: String,

    /// Derived topic names, one per configured suffix.
    pub topics: Vec<String>,

    /// Cluster and client settings derived for this region.
    pub properties: BTreeMap<String, String>,
}
