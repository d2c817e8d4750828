//! Aggregate root abstraction.
//!
//! An aggregate embeds an [`AggregateCore`] holding its identity, version,
//! bucket and pending events, and implements [`AggregateRoot`] to register
//! mutation routines and snapshot hooks. The lifecycle operations live on
//! [`EventSourced`], which every aggregate root gets for free.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{EventShape, SharedEvent};
use crate::handler::HandlerTable;
use crate::memento::Memento;
use crate::runtime::EventRuntime;

/// Where an aggregate instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Nothing restored, replayed or applied yet.
    Uninitialized,
    /// Restored from a snapshot and/or replaying committed history.
    Hydrating,
    /// Accepting new events.
    Live,
}

/// Bookkeeping shared by every aggregate.
#[derive(Debug)]
pub struct AggregateCore {
    id: Uuid,
    version: i64,
    bucket_id: Option<String>,
    pending: Vec<SharedEvent>,
    lifecycle: Lifecycle,
    runtime: Arc<EventRuntime>,
}

impl AggregateCore {
    /// Creates the core of an empty aggregate.
    #[must_use]
    pub fn new(runtime: Arc<EventRuntime>, id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            bucket_id: None,
            pending: Vec::new(),
            lifecycle: Lifecycle::Uninitialized,
            runtime,
        }
    }

    /// Places the aggregate in a bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket_id: Option<String>) -> Self {
        self.bucket_id = bucket_id;
        self
    }

    /// Aggregate identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Committed event count.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Partition tag, if any.
    #[must_use]
    pub fn bucket_id(&self) -> Option<&str> {
        self.bucket_id.as_deref()
    }

    /// Events applied since the last flush, oldest first.
    #[must_use]
    pub fn pending(&self) -> &[SharedEvent] {
        &self.pending
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The runtime this aggregate materializes and dispatches through.
    #[must_use]
    pub fn runtime(&self) -> &Arc<EventRuntime> {
        &self.runtime
    }
}

/// A committed event together with its position in the aggregate's stream.
#[derive(Debug, Clone)]
pub struct CommittedEvent {
    /// Stream the event was committed to.
    pub aggregate_id: Uuid,
    /// 1-based position within the stream.
    pub sequence_number: i64,
    /// The event itself.
    pub event: SharedEvent,
}

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Sized + Send + Sync + 'static {
    /// Aggregate kind, used in diagnostics.
    const KIND: &'static str;

    /// Aggregate-specific part of a snapshot. Use `()` when the aggregate
    /// is never snapshotted.
    type Snapshot: Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Wraps a fresh core into an aggregate with default domain fields.
    fn from_core(core: AggregateCore) -> Self;

    /// Returns the embedded core.
    fn core(&self) -> &AggregateCore;

    /// Returns the embedded core mutably.
    fn core_mut(&mut self) -> &mut AggregateCore;

    /// Registers the mutation routine of every event this aggregate handles.
    /// Called once per runtime.
    fn register_handlers(handlers: &mut HandlerTable<Self>);

    /// Captures the aggregate-specific fields.
    fn take_snapshot(&self) -> Self::Snapshot {
        Self::Snapshot::default()
    }

    /// Restores the aggregate-specific fields.
    fn restore_snapshot(&mut self, _snapshot: Self::Snapshot) {}
}

/// Hydrate/apply/flush/snapshot lifecycle, implemented for every
/// [`AggregateRoot`].
pub trait EventSourced: AggregateRoot {
    /// Aggregate identifier.
    fn aggregate_id(&self) -> Uuid {
        self.core().id
    }

    /// Committed event count. Applied-but-unflushed events are not counted.
    fn version(&self) -> i64 {
        self.core().version
    }

    /// Partition tag, if any.
    fn bucket_id(&self) -> Option<&str> {
        self.core().bucket_id()
    }

    /// Events applied since the last flush, oldest first.
    fn pending_events(&self) -> &[SharedEvent] {
        &self.core().pending
    }

    /// Current lifecycle phase.
    fn lifecycle(&self) -> Lifecycle {
        self.core().lifecycle
    }

    /// Restores identity, version, bucket and domain fields from `memento`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SnapshotMismatch` if the aggregate already
    /// replayed or applied events, or if the memento belongs to another
    /// aggregate or carries a negative version.
    fn hydrate_from_snapshot(&mut self, memento: Memento<Self::Snapshot>) -> Result<(), DomainError> {
        let core = self.core();
        if core.lifecycle != Lifecycle::Uninitialized {
            return Err(DomainError::snapshot_mismatch(
                core.id,
                "a snapshot must be restored before any event is replayed or applied",
            ));
        }
        if memento.id != core.id {
            return Err(DomainError::snapshot_mismatch(
                core.id,
                format!("snapshot belongs to aggregate {}", memento.id),
            ));
        }
        if memento.version < 0 {
            return Err(DomainError::snapshot_mismatch(
                core.id,
                format!("snapshot carries negative version {}", memento.version),
            ));
        }

        self.restore_snapshot(memento.state);

        let core = self.core_mut();
        core.id = memento.id;
        core.version = memento.version;
        core.bucket_id = memento.bucket_id;
        core.lifecycle = Lifecycle::Hydrating;
        debug!(aggregate = Self::KIND, aggregate_id = %core.id, version = core.version, "restored snapshot");
        Ok(())
    }

    /// Replays committed events in order, bumping `version` once per event.
    /// The pending buffer is never touched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingHandler` or
    /// `DomainError::AmbiguousHandler` for the first event that cannot be
    /// dispatched. Events before it stay applied.
    fn hydrate_from_events<I>(&mut self, events: I) -> Result<(), DomainError>
    where
        I: IntoIterator<Item = SharedEvent>,
    {
        let runtime = Arc::clone(self.core().runtime());
        for event in events {
            let routine = runtime.resolver().resolve::<Self>(event.as_ref())?;
            routine(&mut *self, event.as_ref());

            let core = self.core_mut();
            core.version += 1;
            if core.lifecycle == Lifecycle::Uninitialized {
                core.lifecycle = Lifecycle::Hydrating;
            }
        }
        Ok(())
    }

    /// Replays events loaded from a store after checking that they continue
    /// this aggregate's stream exactly where its version leaves off.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SnapshotMismatch` if an event belongs to another
    /// stream or its sequence number does not follow the current version;
    /// nothing is replayed in that case. Dispatch errors are returned as in
    /// [`EventSourced::hydrate_from_events`].
    fn hydrate_from_committed(&mut self, events: Vec<CommittedEvent>) -> Result<(), DomainError> {
        let id = self.aggregate_id();
        let version = self.version();
        let mut expected = version;
        for committed in &events {
            expected += 1;
            if committed.aggregate_id != id {
                return Err(DomainError::snapshot_mismatch(
                    id,
                    format!(
                        "event {} belongs to aggregate {}",
                        committed.sequence_number, committed.aggregate_id
                    ),
                ));
            }
            if committed.sequence_number != expected {
                return Err(DomainError::snapshot_mismatch(
                    id,
                    format!(
                        "expected event {expected} to follow version {version}, found event {}",
                        committed.sequence_number
                    ),
                ));
            }
        }

        self.hydrate_from_events(events.into_iter().map(|committed| committed.event))
    }

    /// Materializes a new `E`, applies it to live state immediately and
    /// records it as pending. `version` is left unchanged until
    /// [`EventSourced::flush`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEventShape`,
    /// `DomainError::MissingHandler` or `DomainError::AmbiguousHandler`. Both
    /// materialization and resolution happen before any state is mutated.
    fn apply<E: EventShape>(&mut self, mutator: impl FnOnce(&mut E)) -> Result<(), DomainError> {
        let runtime = Arc::clone(self.core().runtime());
        let event: SharedEvent = Arc::new(runtime.materializer().materialize::<E>(mutator)?);
        let routine = runtime.resolver().resolve::<Self>(event.as_ref())?;

        routine(&mut *self, event.as_ref());

        let core = self.core_mut();
        core.pending.push(event);
        core.lifecycle = Lifecycle::Live;
        Ok(())
    }

    /// Hands back every pending event, oldest first, and counts them into
    /// `version`.
    #[allow(clippy::cast_possible_wrap)]
    fn flush(&mut self) -> Vec<SharedEvent> {
        let core = self.core_mut();
        let events = std::mem::take(&mut core.pending);
        core.version += events.len() as i64;
        if !events.is_empty() || core.lifecycle != Lifecycle::Uninitialized {
            core.lifecycle = Lifecycle::Live;
        }

        debug!(
            aggregate = Self::KIND,
            aggregate_id = %core.id,
            count = events.len(),
            version = core.version,
            "flushed pending events"
        );
        events
    }

    /// Snapshot of the aggregate: the `take_snapshot` hook's fields plus
    /// identity, version and bucket.
    fn take_memento(&self) -> Memento<Self::Snapshot> {
        let core = self.core();
        Memento {
            id: core.id,
            version: core.version,
            bucket_id: core.bucket_id.clone(),
            state: self.take_snapshot(),
        }
    }
}

impl<A: AggregateRoot> EventSourced for A {}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::event::{Event, EventDescriptor, Member, MemberKind};

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct CreatedUser {
        user_id: u64,
        username: String,
    }

    impl EventShape for CreatedUser {
        const DESCRIPTOR: &'static EventDescriptor = &EventDescriptor {
            kind: "user.created",
            ancestors: &[],
            members: &[
                Member {
                    name: "user_id",
                    kind: MemberKind::Field("u64"),
                },
                Member {
                    name: "username",
                    kind: MemberKind::Field("String"),
                },
            ],
        };
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct UserRenamed {
        username: String,
    }

    impl EventShape for UserRenamed {
        const DESCRIPTOR: &'static EventDescriptor = &EventDescriptor {
            kind: "user.renamed",
            ancestors: &[],
            members: &[Member {
                name: "username",
                kind: MemberKind::Field("String"),
            }],
        };
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct UserPromoted;

    impl EventShape for UserPromoted {
        const DESCRIPTOR: &'static EventDescriptor = &EventDescriptor {
            kind: "user.promoted",
            ancestors: &[],
            members: &[],
        };
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct UserState {
        user_id: u64,
        username: String,
        renames: u32,
    }

    #[derive(Debug)]
    struct UserAggregate {
        core: AggregateCore,
        state: UserState,
    }

    impl AggregateRoot for UserAggregate {
        const KIND: &'static str = "UserAggregate";
        type Snapshot = UserState;

        fn from_core(core: AggregateCore) -> Self {
            Self {
                core,
                state: UserState::default(),
            }
        }

        fn core(&self) -> &AggregateCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut AggregateCore {
            &mut self.core
        }

        fn register_handlers(handlers: &mut HandlerTable<Self>) {
            handlers
                .on::<CreatedUser>(|user, event| {
                    user.state.user_id = event.user_id;
                    user.state.username.clone_from(&event.username);
                })
                .on::<UserRenamed>(|user, event| {
                    user.state.username.clone_from(&event.username);
                    user.state.renames += 1;
                });
        }

        fn take_snapshot(&self) -> UserState {
            self.state.clone()
        }

        fn restore_snapshot(&mut self, snapshot: UserState) {
            self.state = snapshot;
        }
    }

    fn new_user(runtime: &Arc<EventRuntime>, id: Uuid) -> UserAggregate {
        UserAggregate::from_core(AggregateCore::new(Arc::clone(runtime), id))
    }

    fn create_and_rename(user: &mut UserAggregate, names: &[&str]) {
        user.apply::<CreatedUser>(|e| {
            e.user_id = 42;
            e.username = "alice".to_owned();
        })
        .unwrap();
        for name in names {
            user.apply::<UserRenamed>(|e| e.username = (*name).to_owned())
                .unwrap();
        }
    }

    #[test]
    fn test_apply_records_pending_event_without_bumping_version() {
        // Arrange
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());

        // Act
        user.apply::<CreatedUser>(|e| {
            e.user_id = 42;
            e.username = "alice".to_owned();
        })
        .unwrap();

        // Assert
        assert_eq!(user.version(), 0);
        assert_eq!(user.pending_events().len(), 1);
        let pending = user.pending_events()[0]
            .downcast_ref::<CreatedUser>()
            .unwrap();
        assert_eq!(
            pending,
            &CreatedUser {
                user_id: 42,
                username: "alice".to_owned(),
            }
        );
        assert_eq!(user.state.username, "alice");
        assert_eq!(user.lifecycle(), Lifecycle::Live);
    }

    #[test]
    fn test_flush_returns_pending_events_and_advances_version() {
        // Arrange
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());
        user.apply::<CreatedUser>(|e| {
            e.user_id = 42;
            e.username = "alice".to_owned();
        })
        .unwrap();

        // Act
        let flushed = user.flush();

        // Assert
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].event_type(), "user.created");
        assert_eq!(
            flushed[0].downcast_ref::<CreatedUser>().unwrap().username,
            "alice"
        );
        assert_eq!(user.version(), 1);
        assert!(user.pending_events().is_empty());
    }

    #[test]
    fn test_version_is_frozen_until_flush_then_advances_by_applied_count() {
        // Arrange
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());
        user.hydrate_from_events(vec![Arc::new(CreatedUser {
            user_id: 1,
            username: "a".to_owned(),
        }) as SharedEvent])
        .unwrap();
        let before = user.version();

        // Act
        for name in ["b", "c", "d", "e"] {
            user.apply::<UserRenamed>(|e| e.username = name.to_owned())
                .unwrap();
            assert_eq!(user.version(), before);
        }
        let flushed = user.flush();

        // Assert
        assert_eq!(flushed.len(), 4);
        assert_eq!(user.version(), before + 4);
        let names: Vec<&str> = flushed
            .iter()
            .map(|e| e.downcast_ref::<UserRenamed>().unwrap().username.as_str())
            .collect();
        assert_eq!(names, ["b", "c", "d", "e"]);
    }

    #[test]
    fn test_second_flush_is_empty_and_keeps_version() {
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());
        create_and_rename(&mut user, &["bob"]);

        let first = user.flush();
        let second = user.flush();

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(user.version(), 2);
    }

    #[test]
    fn test_replaying_flushed_events_reproduces_state() {
        // Arrange
        let runtime = EventRuntime::shared();
        let id = Uuid::new_v4();
        let mut original = new_user(&runtime, id);
        create_and_rename(&mut original, &["bob", "carol"]);
        let expected_state = original.state.clone();
        let history = original.flush();

        // Act
        let mut replayed = new_user(&runtime, id);
        replayed.hydrate_from_events(history).unwrap();

        // Assert
        assert_eq!(replayed.state, expected_state);
        assert_eq!(replayed.version(), original.version());
        assert!(replayed.pending_events().is_empty());
    }

    #[test]
    fn test_snapshot_plus_tail_matches_full_replay() {
        // Arrange
        let runtime = EventRuntime::shared();
        let id = Uuid::new_v4();
        let mut source = new_user(&runtime, id);
        create_and_rename(&mut source, &["bob", "carol", "dave"]);
        let history = source.flush();

        let mut at_snapshot = new_user(&runtime, id);
        at_snapshot
            .hydrate_from_events(history[..2].iter().cloned())
            .unwrap();
        let memento = at_snapshot.take_memento();

        // Act
        let mut from_snapshot = new_user(&runtime, id);
        from_snapshot.hydrate_from_snapshot(memento).unwrap();
        from_snapshot
            .hydrate_from_events(history[2..].iter().cloned())
            .unwrap();

        let mut full = new_user(&runtime, id);
        full.hydrate_from_events(history.iter().cloned()).unwrap();

        // Assert
        assert_eq!(from_snapshot.state, full.state);
        assert_eq!(from_snapshot.version(), full.version());
        assert_eq!(full.version(), 4);
    }

    #[test]
    fn test_hydrate_from_events_never_touches_pending_buffer() {
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());

        user.hydrate_from_events(vec![Arc::new(CreatedUser::default()) as SharedEvent])
            .unwrap();

        assert!(user.pending_events().is_empty());
        assert_eq!(user.version(), 1);
        assert_eq!(user.lifecycle(), Lifecycle::Hydrating);
    }

    #[test]
    fn test_unhandled_event_fails_before_any_mutation() {
        // Arrange
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());
        create_and_rename(&mut user, &[]);
        let state_before = user.state.clone();

        // Act
        let err = user.apply::<UserPromoted>(|_| {}).unwrap_err();

        // Assert
        match err {
            DomainError::MissingHandler { aggregate, event } => {
                assert_eq!(aggregate, "UserAggregate");
                assert_eq!(event, "user.promoted");
            }
            other => panic!("expected MissingHandler, got {other:?}"),
        }
        assert_eq!(user.state, state_before);
        assert_eq!(user.pending_events().len(), 1);
    }

    #[test]
    fn test_replay_stops_at_first_unhandled_event() {
        // Arrange
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());
        let history: Vec<SharedEvent> = vec![
            Arc::new(CreatedUser {
                user_id: 42,
                username: "alice".to_owned(),
            }) as SharedEvent,
            Arc::new(UserPromoted) as SharedEvent,
            Arc::new(UserRenamed {
                username: "bob".to_owned(),
            }) as SharedEvent,
        ];

        // Act
        let err = user.hydrate_from_events(history).unwrap_err();

        // Assert
        match err {
            DomainError::MissingHandler { aggregate, event } => {
                assert_eq!(aggregate, "UserAggregate");
                assert_eq!(event, "user.promoted");
            }
            other => panic!("expected MissingHandler, got {other:?}"),
        }
        assert_eq!(user.version(), 1);
        assert_eq!(user.state.username, "alice");
        assert_eq!(user.state.renames, 0);
        assert!(user.pending_events().is_empty());
        assert_eq!(user.lifecycle(), Lifecycle::Hydrating);
    }

    #[test]
    fn test_memento_layers_identity_version_and_bucket() {
        // Arrange
        let runtime = EventRuntime::shared();
        let id = Uuid::new_v4();
        let mut user = UserAggregate::from_core(
            AggregateCore::new(Arc::clone(&runtime), id).with_bucket(Some("tenant-a".to_owned())),
        );
        create_and_rename(&mut user, &["bob"]);
        user.flush();

        // Act
        let memento = user.take_memento();

        // Assert
        assert_eq!(memento.id, id);
        assert_eq!(memento.version, 2);
        assert_eq!(memento.bucket_id.as_deref(), Some("tenant-a"));
        assert_eq!(memento.state.username, "bob");
        assert_eq!(memento.state.renames, 1);
    }

    #[test]
    fn test_snapshot_restores_bucket_and_version() {
        // Arrange
        let runtime = EventRuntime::shared();
        let id = Uuid::new_v4();
        let memento = Memento {
            id,
            version: 7,
            bucket_id: Some("tenant-b".to_owned()),
            state: UserState {
                user_id: 9,
                username: "zed".to_owned(),
                renames: 3,
            },
        };
        let mut user = new_user(&runtime, id);

        // Act
        user.hydrate_from_snapshot(memento).unwrap();

        // Assert
        assert_eq!(user.version(), 7);
        assert_eq!(user.bucket_id(), Some("tenant-b"));
        assert_eq!(user.state.username, "zed");
        assert!(user.pending_events().is_empty());
        assert_eq!(user.lifecycle(), Lifecycle::Hydrating);
    }

    #[test]
    fn test_snapshot_after_replay_is_rejected() {
        let runtime = EventRuntime::shared();
        let id = Uuid::new_v4();
        let mut user = new_user(&runtime, id);
        user.hydrate_from_events(vec![Arc::new(CreatedUser::default()) as SharedEvent])
            .unwrap();
        let memento = user.take_memento();

        let err = user.hydrate_from_snapshot(memento).unwrap_err();

        assert!(matches!(err, DomainError::SnapshotMismatch { .. }));
    }

    #[test]
    fn test_snapshot_of_another_aggregate_is_rejected() {
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());
        let memento = Memento {
            id: Uuid::new_v4(),
            version: 1,
            bucket_id: None,
            state: UserState::default(),
        };

        let err = user.hydrate_from_snapshot(memento).unwrap_err();

        assert!(matches!(err, DomainError::SnapshotMismatch { .. }));
        assert_eq!(user.version(), 0);
    }

    #[test]
    fn test_committed_events_must_follow_snapshot_version() {
        // Arrange
        let runtime = EventRuntime::shared();
        let id = Uuid::new_v4();
        let mut user = new_user(&runtime, id);
        user.hydrate_from_snapshot(Memento {
            id,
            version: 3,
            bucket_id: None,
            state: UserState::default(),
        })
        .unwrap();
        let gap = vec![CommittedEvent {
            aggregate_id: id,
            sequence_number: 5,
            event: Arc::new(UserRenamed {
                username: "late".to_owned(),
            }),
        }];

        // Act
        let err = user.hydrate_from_committed(gap).unwrap_err();

        // Assert
        match err {
            DomainError::SnapshotMismatch { aggregate_id, reason } => {
                assert_eq!(aggregate_id, id);
                assert!(reason.contains("expected event 4"));
            }
            other => panic!("expected SnapshotMismatch, got {other:?}"),
        }
        assert_eq!(user.version(), 3);
        assert!(user.state.username.is_empty());
    }

    #[test]
    fn test_committed_events_from_another_stream_are_rejected() {
        let runtime = EventRuntime::shared();
        let id = Uuid::new_v4();
        let mut user = new_user(&runtime, id);
        let foreign = vec![CommittedEvent {
            aggregate_id: Uuid::new_v4(),
            sequence_number: 1,
            event: Arc::new(CreatedUser::default()),
        }];

        let err = user.hydrate_from_committed(foreign).unwrap_err();

        assert!(matches!(err, DomainError::SnapshotMismatch { .. }));
        assert_eq!(user.lifecycle(), Lifecycle::Uninitialized);
    }

    #[test]
    fn test_contiguous_committed_events_replay() {
        let runtime = EventRuntime::shared();
        let id = Uuid::new_v4();
        let mut user = new_user(&runtime, id);
        let history = vec![
            CommittedEvent {
                aggregate_id: id,
                sequence_number: 1,
                event: Arc::new(CreatedUser {
                    user_id: 42,
                    username: "alice".to_owned(),
                }),
            },
            CommittedEvent {
                aggregate_id: id,
                sequence_number: 2,
                event: Arc::new(UserRenamed {
                    username: "bob".to_owned(),
                }),
            },
        ];

        user.hydrate_from_committed(history).unwrap();

        assert_eq!(user.version(), 2);
        assert_eq!(user.state.username, "bob");
    }

    #[test]
    fn test_empty_flush_on_fresh_aggregate_keeps_it_uninitialized() {
        let runtime = EventRuntime::shared();
        let mut user = new_user(&runtime, Uuid::new_v4());

        let flushed = user.flush();

        assert!(flushed.is_empty());
        assert_eq!(user.version(), 0);
        assert_eq!(user.lifecycle(), Lifecycle::Uninitialized);
    }
}
