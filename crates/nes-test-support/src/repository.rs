//! Test repositories: mock `EventRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use nes_core::error::{ConcurrencyConflict, DomainError};
use nes_core::repository::{EventRepository, StoredEvent, StoredSnapshot, StreamId};

/// An in-memory event store with the same optimistic concurrency rule as the
/// Postgres one: an append succeeds only if `expected_version` equals the
/// stream's last sequence number. Like the Postgres store, an empty bucket
/// name addresses the unbucketed stream. Every successful append is also
/// recorded.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: Mutex<HashMap<StreamId, Vec<StoredEvent>>>,
    snapshots: Mutex<HashMap<StreamId, StoredSnapshot>>,
    appended: Mutex<Vec<(StreamId, i64, Vec<StoredEvent>)>>,
}

impl InMemoryEventRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with committed events. Seeded events
    /// are not reported by [`InMemoryEventRepository::appended_events`].
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_events(events: Vec<StoredEvent>) -> Self {
        let store = Self::default();
        {
            let mut streams = store.streams.lock().unwrap();
            for event in events {
                streams.entry(event.stream()).or_default().push(event);
            }
        }
        store
    }

    /// Returns every successful append as `(stream, expected_version, events)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(StreamId, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }

    /// Returns the committed events of a stream.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self, stream: &StreamId) -> Vec<StoredEvent> {
        self.streams
            .lock()
            .unwrap()
            .get(&stream.normalized())
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the stored snapshot of a stream.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn snapshot(&self, stream: &StreamId) -> Option<StoredSnapshot> {
        self.snapshots.lock().unwrap().get(&stream.normalized()).cloned()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(
        &self,
        stream: &StreamId,
        after_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .events(stream)
            .into_iter()
            .filter(|event| event.sequence_number > after_version)
            .collect())
    }

    async fn append_events(
        &self,
        stream: &StreamId,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut streams = self.streams.lock().unwrap();
        let committed = streams.entry(stream.normalized()).or_default();
        let actual = committed.last().map_or(0, |event| event.sequence_number);
        if actual != expected_version {
            return Err(ConcurrencyConflict::new(stream.aggregate_id, expected_version, actual).into());
        }
        committed.extend_from_slice(events);
        drop(streams);

        self.appended
            .lock()
            .unwrap()
            .push((stream.clone(), expected_version, events.to_vec()));
        Ok(())
    }

    async fn load_snapshot(&self, stream: &StreamId) -> Result<Option<StoredSnapshot>, DomainError> {
        Ok(self.snapshot(stream))
    }

    async fn save_snapshot(&self, snapshot: StoredSnapshot) -> Result<(), DomainError> {
        let stream = StreamId {
            aggregate_id: snapshot.aggregate_id,
            bucket_id: snapshot.bucket_id.clone(),
        }
        .normalized();
        self.snapshots.lock().unwrap().insert(stream, snapshot);
        Ok(())
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(
        &self,
        _stream: &StreamId,
        _after_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_events(
        &self,
        _stream: &StreamId,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_snapshot(&self, _stream: &StreamId) -> Result<Option<StoredSnapshot>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save_snapshot(&self, _snapshot: StoredSnapshot) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
