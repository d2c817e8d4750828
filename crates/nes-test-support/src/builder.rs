//! Aggregate builder: constructs aggregates from a list of past events.

use std::marker::PhantomData;
use std::sync::Arc;

use nes_core::aggregate::{AggregateCore, AggregateRoot, EventSourced};
use nes_core::error::DomainError;
use nes_core::event::{EventShape, SharedEvent};
use nes_core::runtime::EventRuntime;
use uuid::Uuid;

/// Collects events, then builds an aggregate that has replayed and
/// committed all of them.
#[derive(Debug)]
pub struct AggregateBuilder<A> {
    runtime: Arc<EventRuntime>,
    id: Uuid,
    bucket_id: Option<String>,
    events: Vec<SharedEvent>,
    aggregate: PhantomData<fn() -> A>,
}

impl<A: AggregateRoot> AggregateBuilder<A> {
    /// Starts a builder for an aggregate with a random id.
    #[must_use]
    pub fn new(runtime: Arc<EventRuntime>) -> Self {
        Self {
            runtime,
            id: Uuid::new_v4(),
            bucket_id: None,
            events: Vec::new(),
            aggregate: PhantomData,
        }
    }

    /// Uses `id` as the aggregate id.
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Places the aggregate in `bucket_id`.
    #[must_use]
    pub fn in_bucket(mut self, bucket_id: impl Into<String>) -> Self {
        self.bucket_id = Some(bucket_id.into());
        self
    }

    /// Materializes an `E` and adds it to the history.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEventShape` if `E` is not plain data.
    pub fn event<E: EventShape>(mut self, mutator: impl FnOnce(&mut E)) -> Result<Self, DomainError> {
        let event = self.runtime.materializer().materialize::<E>(mutator)?;
        self.events.push(Arc::new(event));
        Ok(self)
    }

    /// Replays the collected history into a fresh aggregate and flushes it,
    /// so the result is live with `version` equal to the number of events.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error of the first event the aggregate does not
    /// handle.
    pub fn build(self) -> Result<A, DomainError> {
        let core = AggregateCore::new(self.runtime, self.id).with_bucket(self.bucket_id);
        let mut aggregate = A::from_core(core);
        aggregate.hydrate_from_events(self.events)?;
        aggregate.flush();
        Ok(aggregate)
    }
}
