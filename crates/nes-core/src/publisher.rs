//! Event publisher abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// Receives every batch of events after it has been committed.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a committed batch, in sequence order.
    async fn publish(&self, events: &[StoredEvent]) -> Result<(), DomainError>;
}

/// Publisher that drops every batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

#[async_trait]
impl EventPublisher for NullPublisher {
    async fn publish(&self, _events: &[StoredEvent]) -> Result<(), DomainError> {
        Ok(())
    }
}
