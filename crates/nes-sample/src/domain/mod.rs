//! Domain layer: events, commands and the user aggregate.

pub mod aggregates;
pub mod commands;
pub mod events;
