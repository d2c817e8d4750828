//! Test publishers: mock `EventPublisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use nes_core::error::DomainError;
use nes_core::publisher::EventPublisher;
use nes_core::repository::StoredEvent;

/// A publisher that records every published batch.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    published: Mutex<Vec<Vec<StoredEvent>>>,
}

impl RecordingEventPublisher {
    /// Creates a publisher with no recorded batches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every batch published so far, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_batches(&self) -> Vec<Vec<StoredEvent>> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the event types of every published event, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_types(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|event| event.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, events: &[StoredEvent]) -> Result<(), DomainError> {
        self.published.lock().unwrap().push(events.to_vec());
        Ok(())
    }
}

/// A publisher that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingEventPublisher;

#[async_trait]
impl EventPublisher for FailingEventPublisher {
    async fn publish(&self, _events: &[StoredEvent]) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("broker unavailable".into()))
    }
}
