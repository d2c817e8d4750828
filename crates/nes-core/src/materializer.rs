//! Event materializer.
//!
//! Turns an event description plus a field mutator into a concrete event
//! value. The first use of a description validates it against its concrete
//! type and caches the resulting [`EventShapeInfo`]; every later use is a
//! read-only lookup followed by `Default` construction and the mutator call.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::debug;

use crate::error::DomainError;
use crate::event::{EventDescriptor, EventShape, MemberKind, SharedEvent};

/// Decodes a stored JSON payload into the concrete event type of a shape.
pub type PayloadDecoder = fn(Value) -> Result<SharedEvent, DomainError>;

/// A validated event description bound to its concrete type.
#[derive(Debug)]
pub struct EventShapeInfo {
    descriptor: &'static EventDescriptor,
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<&'static str>,
    decode: PayloadDecoder,
}

impl EventShapeInfo {
    /// Returns the event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.descriptor.kind
    }

    /// Returns the description this shape was synthesized from.
    #[must_use]
    pub fn descriptor(&self) -> &'static EventDescriptor {
        self.descriptor
    }

    /// Returns the concrete Rust type backing the shape.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the concrete type's name, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the data field names in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }
}

#[derive(Debug, Default)]
struct ShapeCache {
    by_type: HashMap<TypeId, Arc<EventShapeInfo>>,
    by_kind: HashMap<&'static str, Arc<EventShapeInfo>>,
}

/// Cache of synthesized event shapes.
#[derive(Debug, Default)]
pub struct EventMaterializer {
    shapes: RwLock<ShapeCache>,
}

impl EventMaterializer {
    /// Creates an empty materializer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shape for `E`, synthesizing it on first use.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEventShape` if the description is not
    /// plain data, disagrees with the concrete type's fields, or reuses a kind
    /// already bound to another type.
    pub fn shape_of<E: EventShape>(&self) -> Result<Arc<EventShapeInfo>, DomainError> {
        let type_id = TypeId::of::<E>();
        if let Some(shape) = self.read().by_type.get(&type_id) {
            return Ok(Arc::clone(shape));
        }

        let mut cache = self.write();
        // Another thread may have won the race for the write lock.
        if let Some(shape) = cache.by_type.get(&type_id) {
            return Ok(Arc::clone(shape));
        }

        let shape = Arc::new(synthesize::<E>()?);
        if let Some(existing) = cache.by_kind.get(shape.kind()) {
            return Err(DomainError::invalid_shape(
                shape.kind(),
                format!("kind is already bound to `{}`", existing.type_name),
            ));
        }
        cache.by_kind.insert(shape.kind(), Arc::clone(&shape));
        cache.by_type.insert(type_id, Arc::clone(&shape));

        debug!(
            kind = shape.kind(),
            type_name = shape.type_name,
            fields = shape.fields.len(),
            "synthesized event shape"
        );
        Ok(shape)
    }

    /// Constructs a default `E`, lets `mutator` assign its fields, and
    /// returns it. Field values are not validated.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEventShape` if `E`'s description cannot be
    /// materialized.
    pub fn materialize<E: EventShape>(
        &self,
        mutator: impl FnOnce(&mut E),
    ) -> Result<E, DomainError> {
        self.shape_of::<E>()?;
        let mut event = E::default();
        mutator(&mut event);
        Ok(event)
    }

    /// Materializes a stored payload as the concrete event registered for
    /// `kind`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if no shape is registered for
    /// `kind` or the payload does not deserialize into it.
    pub fn materialize_payload(&self, kind: &str, payload: Value) -> Result<SharedEvent, DomainError> {
        let shape = self.shape_for_kind(kind).ok_or_else(|| {
            DomainError::Infrastructure(format!("no event shape registered for kind `{kind}`"))
        })?;
        (shape.decode)(payload)
    }

    /// Returns the cached shape registered under `kind`, if any.
    #[must_use]
    pub fn shape_for_kind(&self, kind: &str) -> Option<Arc<EventShapeInfo>> {
        self.read().by_kind.get(kind).cloned()
    }

    /// Number of shapes synthesized so far.
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.read().by_type.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, ShapeCache> {
        self.shapes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShapeCache> {
        self.shapes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn synthesize<E: EventShape>() -> Result<EventShapeInfo, DomainError> {
    let descriptor = E::DESCRIPTOR;
    let type_name = type_name::<E>();
    if descriptor.kind.trim().is_empty() {
        return Err(DomainError::invalid_shape(type_name, "event kind must not be empty"));
    }

    let mut fields = Vec::with_capacity(descriptor.members.len());
    for member in descriptor.members {
        match member.kind {
            MemberKind::Method => {
                return Err(DomainError::invalid_shape(
                    descriptor.kind,
                    format!("member `{}` is a method, not a data field", member.name),
                ));
            }
            MemberKind::Field(_) if fields.contains(&member.name) => {
                return Err(DomainError::invalid_shape(
                    descriptor.kind,
                    format!("field `{}` is declared more than once", member.name),
                ));
            }
            MemberKind::Field(_) => fields.push(member.name),
        }
    }

    check_concrete_fields::<E>(descriptor.kind, &fields)?;

    Ok(EventShapeInfo {
        descriptor,
        type_id: TypeId::of::<E>(),
        type_name,
        fields,
        decode: decode_payload::<E>,
    })
}

/// The default instance must serialize to exactly the declared fields.
fn check_concrete_fields<E: EventShape>(kind: &str, fields: &[&'static str]) -> Result<(), DomainError> {
    let sample = serde_json::to_value(E::default())
        .map_err(|e| DomainError::invalid_shape(kind, format!("default instance does not serialize: {e}")))?;

    match sample {
        Value::Object(map) => {
            if let Some(missing) = fields.iter().find(|f| !map.contains_key(**f)) {
                return Err(DomainError::invalid_shape(
                    kind,
                    format!("declared field `{missing}` is not a field of the concrete type"),
                ));
            }
            if let Some(extra) = map.keys().find(|k| !fields.iter().any(|f| *f == k.as_str())) {
                return Err(DomainError::invalid_shape(
                    kind,
                    format!("concrete field `{extra}` is not declared"),
                ));
            }
            Ok(())
        }
        Value::Null if fields.is_empty() => Ok(()),
        _ => Err(DomainError::invalid_shape(kind, "event must serialize as a struct of named fields")),
    }
}

fn decode_payload<E: EventShape>(payload: Value) -> Result<SharedEvent, DomainError> {
    let event: E = serde_json::from_value(payload).map_err(|e| {
        DomainError::Infrastructure(format!(
            "event `{}` deserialization failed: {e}",
            E::DESCRIPTOR.kind
        ))
    })?;
    Ok(Arc::new(event))
}
