//! Shared test doubles for the event-sourced aggregate runtime.

mod builder;
mod clock;
mod publisher;
mod repository;

pub use builder::AggregateBuilder;
pub use clock::FixedClock;
pub use publisher::{FailingEventPublisher, RecordingEventPublisher};
pub use repository::{FailingEventRepository, InMemoryEventRepository};
