//! Domain error types.

use std::error::Error as StdError;

use thiserror::Error;
use uuid::Uuid;

/// Boxed underlying cause carried by a [`ConcurrencyConflict`].
pub type ConflictCause = Box<dyn StdError + Send + Sync + 'static>;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An event description cannot be materialized as plain data.
    #[error("invalid event shape `{kind}`: {reason}")]
    InvalidEventShape {
        /// The event kind (or type name when the kind is unusable).
        kind: String,
        /// Why the description was rejected.
        reason: String,
    },

    /// No mutation routine matches the aggregate/event pair.
    #[error("aggregate `{aggregate}` has no handler for event `{event}`")]
    MissingHandler {
        /// The aggregate kind.
        aggregate: &'static str,
        /// The runtime event kind.
        event: &'static str,
    },

    /// More than one equally specific mutation routine matches.
    #[error(
        "aggregate `{aggregate}` has ambiguous handlers for event `{event}`: {}",
        .candidates.join(", ")
    )]
    AmbiguousHandler {
        /// The aggregate kind.
        aggregate: &'static str,
        /// The runtime event kind.
        event: &'static str,
        /// Names of every tied candidate, in registration order.
        candidates: Vec<&'static str>,
    },

    /// A snapshot is inconsistent with the aggregate or the events after it.
    #[error("snapshot mismatch on aggregate {aggregate_id}: {reason}")]
    SnapshotMismatch {
        /// The aggregate being hydrated.
        aggregate_id: Uuid,
        /// Description of the inconsistency.
        reason: String,
    },

    /// Optimistic concurrency conflict reported by the event store.
    #[error(transparent)]
    ConcurrencyConflict(#[from] ConcurrencyConflict),

    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

/// The store's version for a stream differed from the version the writer
/// expected.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConcurrencyConflict {
    /// The aggregate that had the conflict.
    pub aggregate_id: Uuid,
    /// The version the writer expected (the aggregate's pre-flush version).
    pub expected: i64,
    /// The version found in the store.
    pub actual: i64,
    message: String,
    #[source]
    cause: Option<ConflictCause>,
}

impl ConcurrencyConflict {
    /// Creates a conflict with a default message and no underlying cause.
    #[must_use]
    pub fn new(aggregate_id: Uuid, expected: i64, actual: i64) -> Self {
        Self {
            aggregate_id,
            expected,
            actual,
            message: format!(
                "concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}"
            ),
            cause: None,
        }
    }

    /// Replaces the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attaches the error that revealed the conflict.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<ConflictCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the underlying cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidEventShape`].
    pub(crate) fn invalid_shape(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEventShape {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`DomainError::SnapshotMismatch`].
    pub(crate) fn snapshot_mismatch(aggregate_id: Uuid, reason: impl Into<String>) -> Self {
        Self::SnapshotMismatch {
            aggregate_id,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_concurrency_conflict_default_message_names_versions() {
        let id = Uuid::new_v4();

        let conflict = ConcurrencyConflict::new(id, 3, 5);

        let msg = conflict.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("expected version 3"));
        assert!(msg.contains("found 5"));
        assert!(conflict.source().is_none());
    }

    #[test]
    fn test_concurrency_conflict_surfaces_cause_verbatim() {
        // Arrange
        let id = Uuid::new_v4();
        let cause = std::io::Error::other("duplicate key");

        // Act
        let err: DomainError = ConcurrencyConflict::new(id, 0, 1)
            .with_message("stream already written")
            .with_cause(cause)
            .into();

        // Assert
        assert_eq!(err.to_string(), "stream already written");
        let source = err.source().expect("conflict should expose its cause");
        assert_eq!(source.to_string(), "duplicate key");
    }

    #[test]
    fn test_ambiguous_handler_lists_every_candidate() {
        let err = DomainError::AmbiguousHandler {
            aggregate: "user",
            event: "user.created",
            candidates: vec!["audit", "projection"],
        };

        assert_eq!(
            err.to_string(),
            "aggregate `user` has ambiguous handlers for event `user.created`: audit, projection"
        );
    }
}
