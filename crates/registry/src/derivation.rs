use std::collections::BTreeMap;

use tracing::debug;

use crate::{Actor, OperationType, RegionStreamConfiguration, TopicConfig};

/// Topic name suffixes derived for every consumer registration: the
/// primary topic and its global mirror.
pub const CONSUMER_TOPIC_SUFFIXES: &[&str] = &["", ".global"];

/// Actor-type tag applied to consumer registrations.
pub const CONSUMER_ACTOR_TYPE: &str = "consumer";

/// Default hint for streams that do not select a region profile.
pub const PRIMARY_HINT: &str = "primary";

/// Resolves the effective hint for a stream.
///
/// A hint counts as unset when absent, blank after trimming, or equal to
/// the literal schema placeholder `"string"`; the primary hint applies in
/// those cases. Otherwise the trimmed, lowercased hint is used.
#[must_use]
pub fn resolve_hint(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") => PRIMARY_HINT.to_string(),
        Some(hint) if hint.eq_ignore_ascii_case("string") => PRIMARY_HINT.to_string(),
        Some(hint) => hint.to_lowercase(),
    }
}

/// Derives an actor's configuration for one region.
///
/// Pure and deterministic: equal inputs produce equal outputs, and the
/// input actor is left untouched. The returned actor carries the input's
/// registrations for other regions plus a freshly derived configuration
/// for `region`, replacing any previous entry for that region in place.
/// Mutation paths rely on the determinism to regenerate configurations
/// wholesale on every update instead of patching fields.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn derive_actor_config(
    stream_name: &str,
    region: &str,
    actor: &Actor,
    operation: OperationType,
    suffixes: &[&str],
    hint: &str,
    actor_type: &str,
    topic_config: &TopicConfig,
) -> Actor {
    debug!(
        stream = stream_name,
        actor = %actor.name,
        region,
        ?operation,
        hint,
        actor_type,
        "deriving region configuration"
    );

    let topics = suffixes
        .iter()
        .map(|suffix| format!("{stream_name}{suffix}"))
        .collect();

    let mut properties: BTreeMap<String, String> = topic_config.properties.clone();
    properties.insert(
        "cluster".to_string(),
        format!("{hint}-{region}-{actor_type}"),
    );
    properties.insert("partitions".to_string(), topic_config.partitions.to_string());
    properties.insert(
        "replication.factor".to_string(),
        topic_config.replication_factor.to_string(),
    );
    properties.insert("actor.type".to_string(), actor_type.to_string());

    let derived = RegionStreamConfiguration {
        region: region.to_string(),
        topics,
        properties,
    };

    let mut region_configurations = actor.region_configurations.clone();
    match region_configurations
        .iter()
        .position(|configuration| configuration.region == region)
    {
        Some(index) => region_configurations[index] = derived,
        None => region_configurations.push(derived),
    }

    Actor {
        name: actor.name.clone(),
        region_configurations,
    }
}
