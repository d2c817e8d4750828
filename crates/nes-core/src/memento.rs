//! Aggregate snapshots.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point-in-time state of an aggregate.
///
/// The runtime owns `id`, `version` and `bucket_id`; `state` is whatever the
/// aggregate's `take_snapshot` hook contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memento<S> {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Committed event count at the time the snapshot was taken.
    pub version: i64,
    /// Partition tag of the aggregate's stream.
    pub bucket_id: Option<String>,
    /// Aggregate-specific fields.
    pub state: S,
}
