//! Loading and saving aggregates through the collaborator traits.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::{AggregateCore, AggregateRoot, CommittedEvent, EventSourced, Lifecycle};
use crate::clock::Clock;
use crate::error::DomainError;
use crate::memento::Memento;
use crate::publisher::EventPublisher;
use crate::repository::{EventRepository, StoredEvent, StoredSnapshot, StreamId};
use crate::runtime::EventRuntime;

/// When [`Repository::save`] stores a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    /// Never.
    #[default]
    Never,
    /// Whenever a save carries the version across a multiple of `n`.
    /// `EveryNEvents(0)` behaves like `Never`.
    EveryNEvents(u32),
    /// After every save that committed at least one event.
    Always,
}

impl SnapshotPolicy {
    /// Whether a save that moved the version from `before` to `after` should
    /// be followed by a snapshot.
    #[must_use]
    pub fn should_snapshot(self, before: i64, after: i64) -> bool {
        if after <= before {
            return false;
        }
        match self {
            Self::Never | Self::EveryNEvents(0) => false,
            Self::EveryNEvents(n) => {
                let n = i64::from(n);
                after / n > before / n
            }
            Self::Always => true,
        }
    }
}

/// Unit of work over an [`EventRepository`].
///
/// Loads aggregates from their latest snapshot plus the committed tail, and
/// saves their pending events with the version they were loaded at as the
/// expected version.
pub struct Repository {
    runtime: Arc<EventRuntime>,
    store: Arc<dyn EventRepository>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    snapshot_policy: SnapshotPolicy,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("runtime", &self.runtime)
            .field("snapshot_policy", &self.snapshot_policy)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Creates a repository that never snapshots.
    #[must_use]
    pub fn new(
        runtime: Arc<EventRuntime>,
        store: Arc<dyn EventRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            runtime,
            store,
            publisher,
            clock,
            snapshot_policy: SnapshotPolicy::Never,
        }
    }

    /// Sets the snapshot policy.
    #[must_use]
    pub fn with_snapshot_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.snapshot_policy = policy;
        self
    }

    /// Returns the runtime aggregates are created with.
    #[must_use]
    pub fn runtime(&self) -> &Arc<EventRuntime> {
        &self.runtime
    }

    /// Returns an empty aggregate bound to `stream`.
    #[must_use]
    pub fn create<A: AggregateRoot>(&self, stream: &StreamId) -> A {
        A::from_core(
            AggregateCore::new(Arc::clone(&self.runtime), stream.aggregate_id)
                .with_bucket(stream.bucket_id.clone()),
        )
    }

    /// Loads an existing aggregate.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the stream has neither a
    /// snapshot nor events, plus every error of [`Repository::load_or_new`].
    pub async fn load<A: AggregateRoot>(&self, stream: &StreamId) -> Result<A, DomainError> {
        let aggregate = self.load_or_new::<A>(stream).await?;
        if aggregate.lifecycle() == Lifecycle::Uninitialized {
            return Err(DomainError::AggregateNotFound(stream.aggregate_id));
        }
        Ok(aggregate)
    }

    /// Loads an aggregate, or returns an empty one if the stream is empty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SnapshotMismatch` if the snapshot or the
    /// committed tail do not line up with the stream,
    /// `DomainError::Infrastructure` if a payload cannot be decoded, and
    /// dispatch errors from replay.
    pub async fn load_or_new<A: AggregateRoot>(&self, stream: &StreamId) -> Result<A, DomainError> {
        self.runtime.prepare::<A>()?;
        let mut aggregate = self.create::<A>(stream);

        if let Some(snapshot) = self.store.load_snapshot(stream).await? {
            let memento = decode_memento::<A>(stream, snapshot)?;
            aggregate.hydrate_from_snapshot(memento)?;
        }

        let events = self.store.load_events(stream, aggregate.version()).await?;
        let committed = events
            .into_iter()
            .map(|stored| {
                Ok(CommittedEvent {
                    aggregate_id: stored.aggregate_id,
                    sequence_number: stored.sequence_number,
                    event: self.runtime.decode(&stored.event_type, stored.payload)?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let replayed = committed.len();
        aggregate.hydrate_from_committed(committed)?;

        debug!(
            aggregate = A::KIND,
            stream = %stream,
            replayed,
            version = aggregate.version(),
            "loaded aggregate"
        );
        Ok(aggregate)
    }

    /// Flushes the aggregate's pending events and appends them to its stream.
    /// Returns the committed batch, which is empty if nothing was pending.
    ///
    /// The aggregate is flushed once the whole batch has serialized and
    /// before the append; a serialization failure leaves it untouched, while
    /// after a failed append it must be reloaded.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` unchanged when the stream
    /// moved past the version the aggregate was loaded at, and
    /// `DomainError::Infrastructure` for store, publisher or serialization
    /// failures.
    pub async fn save<A: AggregateRoot>(
        &self,
        aggregate: &mut A,
        correlation_id: Uuid,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let expected_version = aggregate.version();
        let stream = StreamId {
            aggregate_id: aggregate.aggregate_id(),
            bucket_id: aggregate.bucket_id().map(str::to_owned),
        };
        let occurred_at = self.clock.now();

        let mut batch = Vec::with_capacity(aggregate.pending_events().len());
        let mut sequence_number = expected_version;
        for event in aggregate.pending_events() {
            sequence_number += 1;
            batch.push(StoredEvent {
                event_id: Uuid::now_v7(),
                aggregate_id: stream.aggregate_id,
                bucket_id: stream.bucket_id.clone(),
                event_type: event.event_type().to_owned(),
                payload: event.to_payload()?,
                sequence_number,
                correlation_id,
                causation_id: correlation_id,
                occurred_at,
            });
        }
        if batch.is_empty() {
            return Ok(batch);
        }
        // Only flush once every payload serialized.
        aggregate.flush();

        if let Err(err) = self.store.append_events(&stream, expected_version, &batch).await {
            if let DomainError::ConcurrencyConflict(conflict) = &err {
                warn!(
                    aggregate = A::KIND,
                    stream = %stream,
                    expected = conflict.expected,
                    actual = conflict.actual,
                    "concurrency conflict while appending events"
                );
            }
            return Err(err);
        }

        info!(
            aggregate = A::KIND,
            stream = %stream,
            count = batch.len(),
            version = aggregate.version(),
            correlation_id = %correlation_id,
            "appended events"
        );

        self.publisher.publish(&batch).await?;

        if self
            .snapshot_policy
            .should_snapshot(expected_version, aggregate.version())
        {
            self.store_snapshot(aggregate).await?;
        }

        Ok(batch)
    }

    /// Serializes the aggregate's memento and stores it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the memento cannot be
    /// serialized or stored.
    pub async fn store_snapshot<A: AggregateRoot>(&self, aggregate: &A) -> Result<(), DomainError> {
        let memento = aggregate.take_memento();
        let payload = serde_json::to_value(&memento).map_err(|e| {
            DomainError::Infrastructure(format!("failed to serialize snapshot: {e}"))
        })?;
        let snapshot = StoredSnapshot {
            aggregate_id: memento.id,
            bucket_id: memento.bucket_id,
            version: memento.version,
            payload,
            taken_at: self.clock.now(),
        };
        let version = snapshot.version;
        self.store.save_snapshot(snapshot).await?;

        debug!(aggregate = A::KIND, aggregate_id = %memento.id, version, "stored snapshot");
        Ok(())
    }
}

fn decode_memento<A: AggregateRoot>(
    stream: &StreamId,
    snapshot: StoredSnapshot,
) -> Result<Memento<A::Snapshot>, DomainError> {
    let memento: Memento<A::Snapshot> = serde_json::from_value(snapshot.payload).map_err(|e| {
        DomainError::Infrastructure(format!("failed to decode snapshot of {stream}: {e}"))
    })?;
    if memento.version != snapshot.version {
        return Err(DomainError::snapshot_mismatch(
            stream.aggregate_id,
            format!(
                "snapshot stored at version {} carries version {}",
                snapshot.version, memento.version
            ),
        ));
    }
    if memento.bucket_id != stream.bucket_id {
        return Err(DomainError::snapshot_mismatch(
            stream.aggregate_id,
            format!("snapshot belongs to bucket {:?}", memento.bucket_id),
        ));
    }
    Ok(memento)
}
