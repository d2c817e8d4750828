//! `PostgreSQL` event store for the aggregate runtime.

pub mod pg_event_repository;
pub mod schema;

pub use pg_event_repository::PgEventRepository;
