//! Aggregate roots for the user-management context.

use nes_core::aggregate::{AggregateCore, AggregateRoot, EventSourced, Lifecycle};
use nes_core::error::DomainError;
use nes_core::event::Event;
use nes_core::handler::HandlerTable;
use serde::{Deserialize, Serialize};

use crate::domain::events::{
    CreatedUser, USER_ACTIVITY_KIND, UserDeactivated, UserLoggedIn, UserRenamed,
};

/// Snapshot of the user-specific fields of a [`UserAggregate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// Current username.
    pub username: String,
    /// Whether the user has been created and not deactivated.
    pub active: bool,
    /// Number of activity events seen.
    pub activity_count: u64,
    /// Kind of the most recent activity event.
    pub last_activity: Option<String>,
}

/// The aggregate root for a user.
#[derive(Debug)]
pub struct UserAggregate {
    core: AggregateCore,
    /// Current username.
    pub username: String,
    /// Whether the user has been created and not deactivated.
    pub active: bool,
    /// Number of activity events seen.
    pub activity_count: u64,
    /// Kind of the most recent activity event.
    pub last_activity: Option<String>,
}

impl AggregateRoot for UserAggregate {
    const KIND: &'static str = "UserAggregate";
    type Snapshot = UserSnapshot;

    fn from_core(core: AggregateCore) -> Self {
        Self {
            core,
            username: String::new(),
            active: false,
            activity_count: 0,
            last_activity: None,
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
                user.username.clone_from(&event.username);
                user.active = true;
            })
            .on::<UserRenamed>(|user, event| user.username.clone_from(&event.username))
            .on::<UserDeactivated>(|user, _| user.active = false)
            .on_kind("record_activity", USER_ACTIVITY_KIND, record_activity)
            .event::<UserLoggedIn>();
    }

    fn take_snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            username: self.username.clone(),
            active: self.active,
            activity_count: self.activity_count,
            last_activity: self.last_activity.clone(),
        }
    }

    fn restore_snapshot(&mut self, snapshot: UserSnapshot) {
        self.username = snapshot.username;
        self.active = snapshot.active;
        self.activity_count = snapshot.activity_count;
        self.last_activity = snapshot.last_activity;
    }
}

fn record_activity(user: &mut UserAggregate, event: &dyn Event) {
    user.activity_count += 1;
    user.last_activity = Some(event.event_type().to_owned());
}

impl UserAggregate {
    /// Whether the user exists, i.e. has been created.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.lifecycle() != Lifecycle::Uninitialized
    }

    /// Creates the user.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the user already exists or the
    /// username is blank.
    pub fn create(&mut self, username: &str) -> Result<(), DomainError> {
        if self.exists() {
            return Err(DomainError::Validation(format!(
                "user {} already exists",
                self.aggregate_id()
            )));
        }
        let username = validated_username(username)?;
        let user_id = self.aggregate_id();
        self.apply::<CreatedUser>(|e| {
            e.user_id = user_id;
            e.username = username;
        })
    }

    /// Renames the user. Renaming to the current name is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the user is inactive or the
    /// username is blank.
    pub fn rename(&mut self, username: &str) -> Result<(), DomainError> {
        self.ensure_active()?;
        let username = validated_username(username)?;
        if username == self.username {
            return Ok(());
        }
        let previous = self.username.clone();
        self.apply::<UserRenamed>(|e| {
            e.previous = previous;
            e.username = username;
        })
    }

    /// Deactivates the user.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the user is already inactive.
    pub fn deactivate(&mut self, reason: &str) -> Result<(), DomainError> {
        self.ensure_active()?;
        let reason = reason.trim().to_owned();
        self.apply::<UserDeactivated>(|e| e.reason = reason)
    }

    /// Records a login.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the user is inactive.
    pub fn record_login(&mut self, source: &str) -> Result<(), DomainError> {
        self.ensure_active()?;
        let source = source.to_owned();
        self.apply::<UserLoggedIn>(|e| e.source = source)
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::AggregateNotFound(self.aggregate_id()));
        }
        if !self.active {
            return Err(DomainError::Validation(format!(
                "user {} is deactivated",
                self.aggregate_id()
            )));
        }
        Ok(())
    }
}

fn validated_username(username: &str) -> Result<String, DomainError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(DomainError::Validation(
            "username must not be empty".into(),
        ));
    }
    Ok(username.to_owned())
}
