//! Handler registration and resolution.
//!
//! Each aggregate kind registers its mutation routines once in a
//! [`HandlerTable`]. The [`HandlerResolver`] builds that table on first use
//! and caches the routine selected for every (aggregate type, event type)
//! pair it resolves.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::{Event, EventShape};
use crate::materializer::{EventMaterializer, EventShapeInfo};

/// Routine applying one event's effect to an aggregate's live state.
pub type MutationRoutine<A> = Arc<dyn Fn(&mut A, &dyn Event) + Send + Sync>;

type ShapeRegistration = fn(&EventMaterializer) -> Result<Arc<EventShapeInfo>, DomainError>;

#[derive(Debug, Clone, Copy)]
enum Accepts {
    /// Exactly one concrete event type.
    Type(TypeId),
    /// Any event whose kind or ancestor kinds include this tag.
    Kind(&'static str),
}

struct HandlerEntry<A> {
    name: &'static str,
    accepts: Accepts,
    routine: MutationRoutine<A>,
}

/// Mutation routines registered by one aggregate kind, plus the concrete
/// event types its stream may contain.
pub struct HandlerTable<A> {
    entries: Vec<HandlerEntry<A>>,
    shapes: Vec<ShapeRegistration>,
}

impl<A> fmt::Debug for HandlerTable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("handlers", &self.handler_names())
            .finish()
    }
}

impl<A> Default for HandlerTable<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            shapes: Vec::new(),
        }
    }
}

impl<A> HandlerTable<A> {
    /// Number of registered routines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn handler_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }
}

impl<A: 'static> HandlerTable<A> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a routine for the concrete event type `E`, named after its
    /// kind.
    pub fn on<E: EventShape>(
        &mut self,
        routine: impl Fn(&mut A, &E) + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_named(E::DESCRIPTOR.kind, routine)
    }

    /// Registers a named routine for the concrete event type `E`.
    pub fn on_named<E: EventShape>(
        &mut self,
        name: &'static str,
        routine: impl Fn(&mut A, &E) + Send + Sync + 'static,
    ) -> &mut Self {
        self.entries.push(HandlerEntry {
            name,
            accepts: Accepts::Type(TypeId::of::<E>()),
            routine: Arc::new(move |aggregate: &mut A, event: &dyn Event| {
                // Only reached when the event's TypeId is E's.
                if let Some(event) = event.downcast_ref::<E>() {
                    routine(aggregate, event);
                }
            }),
        });
        self.event::<E>()
    }

    /// Registers a routine accepting every event assignable to `kind`,
    /// either as its own kind or through its ancestors.
    pub fn on_kind(
        &mut self,
        name: &'static str,
        kind: &'static str,
        routine: impl Fn(&mut A, &dyn Event) + Send + Sync + 'static,
    ) -> &mut Self {
        self.entries.push(HandlerEntry {
            name,
            accepts: Accepts::Kind(kind),
            routine: Arc::new(routine),
        });
        self
    }

    /// Declares `E` as an event of this aggregate's stream without a routine
    /// of its own, so stored `E` payloads can be decoded when `E` is handled
    /// through one of its ancestor kinds. Types registered with `on` are
    /// declared automatically.
    pub fn event<E: EventShape>(&mut self) -> &mut Self {
        self.shapes.push(EventMaterializer::shape_of::<E>);
        self
    }

    /// Runs a shared registration function against this table, so several
    /// aggregate kinds can inherit the same routines.
    pub fn include(&mut self, register: fn(&mut HandlerTable<A>)) -> &mut Self {
        register(self);
        self
    }

    /// Synthesizes the shape of every concrete event type the table declares,
    /// so stored payloads of those kinds can be materialized.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEventShape` if any declared type has an
    /// invalid description.
    pub fn register_shapes(&self, materializer: &EventMaterializer) -> Result<(), DomainError> {
        for register in &self.shapes {
            register(materializer)?;
        }
        Ok(())
    }

    /// Picks the most specific routine for `event`.
    fn select(&self, aggregate: &'static str, event: &dyn Event) -> Result<&HandlerEntry<A>, DomainError> {
        let descriptor = event.descriptor();
        let type_id = event.as_any().type_id();

        let exact = self.pick(aggregate, event, |accepts| match accepts {
            Accepts::Type(id) => id == type_id,
            Accepts::Kind(kind) => kind == descriptor.kind,
        })?;
        if let Some(entry) = exact {
            return Ok(entry);
        }

        for level in descriptor.ancestors {
            let inherited = self.pick(aggregate, event, |accepts| {
                matches!(accepts, Accepts::Kind(kind) if level.contains(&kind))
            })?;
            if let Some(entry) = inherited {
                return Ok(entry);
            }
        }

        Err(DomainError::MissingHandler {
            aggregate,
            event: descriptor.kind,
        })
    }

    fn pick(
        &self,
        aggregate: &'static str,
        event: &dyn Event,
        accepts_event: impl Fn(Accepts) -> bool,
    ) -> Result<Option<&HandlerEntry<A>>, DomainError> {
        let candidates: Vec<&HandlerEntry<A>> =
            self.entries.iter().filter(|entry| accepts_event(entry.accepts)).collect();
        match candidates.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            tied => Err(DomainError::AmbiguousHandler {
                aggregate,
                event: event.event_type(),
                candidates: tied.iter().map(|entry| entry.name).collect(),
            }),
        }
    }
}

type Erased = Arc<dyn Any + Send + Sync>;

/// Builds handler tables on first use and caches resolved routines.
#[derive(Default)]
pub struct HandlerResolver {
    tables: RwLock<HashMap<TypeId, Erased>>,
    bindings: RwLock<HashMap<(TypeId, TypeId), Erased>>,
}

impl fmt::Debug for HandlerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerResolver")
            .field("tables", &self.table_count())
            .field("bindings", &self.binding_count())
            .finish()
    }
}

impl HandlerResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handler table of `A`, building it on first use.
    pub fn table<A: AggregateRoot>(&self) -> Arc<HandlerTable<A>> {
        let key = TypeId::of::<A>();
        if let Some(table) = Self::typed_table::<A>(
            self.tables.read().unwrap_or_else(PoisonError::into_inner).get(&key),
        ) {
            return table;
        }

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = Self::typed_table::<A>(tables.get(&key)) {
            return table;
        }

        let mut table = HandlerTable::new();
        A::register_handlers(&mut table);
        let table = Arc::new(table);
        tables.insert(key, Arc::clone(&table) as Erased);

        debug!(aggregate = A::KIND, handlers = table.len(), "built handler table");
        table
    }

    /// Resolves the routine applying `event` to an `A`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingHandler` if no routine accepts the event,
    /// or `DomainError::AmbiguousHandler` if the most specific match is not
    /// unique.
    pub fn resolve<A: AggregateRoot>(&self, event: &dyn Event) -> Result<MutationRoutine<A>, DomainError> {
        let key = (TypeId::of::<A>(), event.as_any().type_id());
        let cached = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .and_then(|binding| binding.downcast_ref::<MutationRoutine<A>>())
            .cloned();
        if let Some(routine) = cached {
            return Ok(routine);
        }

        let table = self.table::<A>();
        let entry = table.select(A::KIND, event)?;
        let routine = Arc::clone(&entry.routine);

        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| Arc::new(Arc::clone(&routine)) as Erased);

        debug!(
            aggregate = A::KIND,
            event = event.event_type(),
            handler = entry.name,
            "bound mutation routine"
        );
        Ok(routine)
    }

    /// Number of cached (aggregate, event) bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of handler tables built.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn typed_table<A: AggregateRoot>(erased: Option<&Erased>) -> Option<Arc<HandlerTable<A>>> {
        erased
            .cloned()
            .and_then(|table| table.downcast::<HandlerTable<A>>().ok())
    }
}
