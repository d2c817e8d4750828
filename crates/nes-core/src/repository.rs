//! Event repository abstraction.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifies one aggregate stream: its identity plus optional bucket.
///
/// An empty bucket name is the same stream as no bucket; stores key streams
/// by [`StreamId::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId {
    /// Aggregate this stream belongs to.
    pub aggregate_id: Uuid,
    /// Partition tag, if any.
    pub bucket_id: Option<String>,
}

impl StreamId {
    /// A stream outside any bucket.
    #[must_use]
    pub fn new(aggregate_id: Uuid) -> Self {
        Self {
            aggregate_id,
            bucket_id: None,
        }
    }

    /// A stream inside `bucket_id`. An empty name means no bucket.
    #[must_use]
    pub fn in_bucket(aggregate_id: Uuid, bucket_id: impl Into<String>) -> Self {
        let bucket_id: String = bucket_id.into();
        Self {
            aggregate_id,
            bucket_id: (!bucket_id.is_empty()).then_some(bucket_id),
        }
    }

    /// The same stream with an empty bucket name replaced by no bucket.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            aggregate_id: self.aggregate_id,
            bucket_id: self.bucket_id.clone().filter(|bucket| !bucket.is_empty()),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bucket_id {
            Some(bucket) => write!(f, "{bucket}/{}", self.aggregate_id),
            None => write!(f, "{}", self.aggregate_id),
        }
    }
}

/// Stored representation of a domain event.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Bucket of the aggregate's stream.
    pub bucket_id: Option<String>,
    /// Event kind, used to pick the decoder on load.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// The stream this event was appended to.
    #[must_use]
    pub fn stream(&self) -> StreamId {
        StreamId {
            aggregate_id: self.aggregate_id,
            bucket_id: self.bucket_id.clone(),
        }
        .normalized()
    }
}

/// Stored representation of an aggregate snapshot.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    /// Aggregate the snapshot belongs to.
    pub aggregate_id: Uuid,
    /// Bucket of the aggregate's stream.
    pub bucket_id: Option<String>,
    /// Version the aggregate had when the snapshot was taken.
    pub version: i64,
    /// Serialized memento.
    pub payload: serde_json::Value,
    /// Timestamp of snapshot creation.
    pub taken_at: DateTime<Utc>,
}

/// Repository trait for loading and appending domain events and snapshots.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load the events of a stream with a sequence number greater than
    /// `after_version`, ordered by sequence number.
    async fn load_events(
        &self,
        stream: &StreamId,
        after_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to a stream with optimistic concurrency.
    /// `expected_version` is the last known sequence number.
    async fn append_events(
        &self,
        stream: &StreamId,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Load the most recent snapshot of a stream.
    async fn load_snapshot(&self, stream: &StreamId) -> Result<Option<StoredSnapshot>, DomainError>;

    /// Store a snapshot, replacing any older one of the same stream.
    async fn save_snapshot(&self, snapshot: StoredSnapshot) -> Result<(), DomainError>;
}
