//! The shared event runtime.

use std::sync::Arc;

use serde_json::Value;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::SharedEvent;
use crate::handler::HandlerResolver;
use crate::materializer::EventMaterializer;

/// Owns the materializer and the handler resolver.
///
/// One runtime should serve every aggregate of an event family so that both
/// caches stay coherent. Aggregates hold it through an `Arc`; dropping the
/// last reference tears both caches down.
#[derive(Debug, Default)]
pub struct EventRuntime {
    materializer: EventMaterializer,
    resolver: HandlerResolver,
}

impl EventRuntime {
    /// Creates a runtime with empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runtime ready to be shared between aggregates.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the event materializer.
    #[must_use]
    pub fn materializer(&self) -> &EventMaterializer {
        &self.materializer
    }

    /// Returns the handler resolver.
    #[must_use]
    pub fn resolver(&self) -> &HandlerResolver {
        &self.resolver
    }

    /// Builds `A`'s handler table and synthesizes the shape of every event
    /// type it handles or declares.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEventShape` if a handled event type has
    /// an invalid description.
    pub fn prepare<A: AggregateRoot>(&self) -> Result<(), DomainError> {
        self.resolver.table::<A>().register_shapes(&self.materializer)
    }

    /// Materializes a stored payload of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the kind is unknown or the
    /// payload does not fit it.
    pub fn decode(&self, kind: &str, payload: Value) -> Result<SharedEvent, DomainError> {
        self.materializer.materialize_payload(kind, payload)
    }
}
