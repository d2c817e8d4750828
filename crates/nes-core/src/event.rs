//! Domain event abstractions.
//!
//! Every concrete event is a plain data struct implementing [`EventShape`].
//! Its [`EventDescriptor`] is the abstract description the materializer
//! validates and caches; the struct itself is the concrete value shape.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DomainError;

/// An immutable, shareable event value.
pub type SharedEvent = Arc<dyn Event>;

/// Kind of member declared by an event description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// A plain data field with the given type name.
    Field(&'static str),
    /// Behaviour rather than data. Never materializable.
    Method,
}

/// A named member of an event description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// Member name as it appears in the payload.
    pub name: &'static str,
    /// What the member is.
    pub kind: MemberKind,
}

/// Abstract description of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDescriptor {
    /// Logical event kind, unique per concrete type (e.g. `"user.created"`).
    pub kind: &'static str,
    /// Kinds this event is assignable to, grouped by distance: the first
    /// slice holds direct parents, the next their parents, and so on.
    pub ancestors: &'static [&'static [&'static str]],
    /// Declared members, including those inherited from ancestors.
    pub members: &'static [Member],
}

impl EventDescriptor {
    /// Returns `true` if an event of this description can be handled by a
    /// routine accepting `kind`.
    #[must_use]
    pub fn is_assignable_to(&self, kind: &str) -> bool {
        self.kind == kind
            || self
                .ancestors
                .iter()
                .any(|level| level.iter().any(|ancestor| *ancestor == kind))
    }
}

/// Object-safe view of an event value.
///
/// Implemented for every [`EventShape`]; aggregates and collaborators only
/// ever see events through this trait.
pub trait Event: Any + Send + Sync + fmt::Debug {
    /// Returns the event's description.
    fn descriptor(&self) -> &'static EventDescriptor;

    /// Serializes the event payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a field refuses to serialize.
    fn to_payload(&self) -> Result<serde_json::Value, DomainError>;

    /// Upcast used for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Returns the event kind.
    fn event_type(&self) -> &'static str {
        self.descriptor().kind
    }
}

/// A concrete event type with a compile-time description.
///
/// The declared members are checked against the JSON object a default
/// instance serializes to, so every declared field must appear there and
/// nothing else may. Attributes that change that object, such as
/// `#[serde(skip_serializing_if = ...)]` or `#[serde(flatten)]`, make an
/// otherwise valid event fail with `DomainError::InvalidEventShape`.
///
/// ```ignore
/// #[derive(Debug, Default, Clone, Serialize, Deserialize)]
/// #[serde(default)]
/// pub struct CreatedUser {
///     pub user_id: u64,
///     pub username: String,
/// }
///
/// impl EventShape for CreatedUser {
///     const DESCRIPTOR: &'static EventDescriptor = &EventDescriptor {
///         kind: "user.created",
///         ancestors: &[&["user.event"]],
///         members: &[
///             Member { name: "user_id", kind: MemberKind::Field("u64") },
///             Member { name: "username", kind: MemberKind::Field("String") },
///         ],
///     };
/// }
/// ```
pub trait EventShape:
    Default + Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static
{
    /// The description validated by the materializer.
    const DESCRIPTOR: &'static EventDescriptor;
}

impl<E: EventShape> Event for E {
    fn descriptor(&self) -> &'static EventDescriptor {
        E::DESCRIPTOR
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        serde_json::to_value(self).map_err(|e| {
            DomainError::Infrastructure(format!(
                "event `{}` serialization failed: {e}",
                E::DESCRIPTOR.kind
            ))
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<'a> dyn Event + 'a {
    /// Returns the concrete event if it is an `E`.
    #[must_use]
    pub fn downcast_ref<E: EventShape>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}
