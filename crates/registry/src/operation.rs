use serde::{Deserialize, Serialize};

/// The registry operation last applied to a record.
///
/// Informational: the marker rides along on published records and on
/// in-memory copies served by reads, but nothing consumes it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum OperationType {
    /// A new registration was appended.
    Create,

    /// An existing registration was regenerated or extended.
    Update,

    /// The record was served from the local view.
    Get,

    /// A registration was removed.
    Delete,
}
