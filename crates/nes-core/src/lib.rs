//! Event-sourced aggregate runtime.
//!
//! Events are plain serde structs described by an [`event::EventShape`]. The
//! [`runtime::EventRuntime`] validates and caches those descriptions and binds
//! each event type to the aggregate routine that handles it. Aggregates embed
//! an [`aggregate::AggregateCore`] and get the hydrate/apply/flush/snapshot
//! lifecycle from [`aggregate::EventSourced`]. Persistence goes through the
//! collaborator traits in [`repository`] and [`publisher`], driven by
//! [`unit_of_work::Repository`].

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod handler;
pub mod materializer;
pub mod memento;
pub mod publisher;
pub mod repository;
pub mod runtime;
pub mod unit_of_work;
