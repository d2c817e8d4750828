//! Sample user-management bounded context.
//!
//! Users are created, renamed, deactivated and record logins; every change
//! is an event applied through the aggregate runtime and persisted through
//! the event store.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
