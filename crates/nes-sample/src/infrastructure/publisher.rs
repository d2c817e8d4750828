//! Publisher that reports committed events through `tracing`.

use async_trait::async_trait;
use nes_core::error::DomainError;
use nes_core::publisher::EventPublisher;
use nes_core::repository::StoredEvent;
use tracing::info;

/// Logs every committed event at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, events: &[StoredEvent]) -> Result<(), DomainError> {
        for event in events {
            info!(
                event_id = %event.event_id,
                aggregate_id = %event.aggregate_id,
                event_type = %event.event_type,
                sequence_number = event.sequence_number,
                correlation_id = %event.correlation_id,
                "published event"
            );
        }
        Ok(())
    }
}
