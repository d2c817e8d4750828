//! Infrastructure adapters.

pub mod publisher;
