//! Domain events for the user-management context.
//!
//! Every event descends from [`USER_EVENT_KIND`]; login-style events also
//! descend from [`USER_ACTIVITY_KIND`] and are handled through that kind
//! rather than one routine per type.

use nes_core::event::{EventDescriptor, EventShape, Member, MemberKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ancestor kind shared by every user event.
pub const USER_EVENT_KIND: &str = "user.event";

/// Ancestor kind of events that only count as user activity.
pub const USER_ACTIVITY_KIND: &str = "user.activity";

/// Event type of [`CreatedUser`].
pub const CREATED_USER_EVENT_TYPE: &str = "user.created";

/// Event type of [`UserRenamed`].
pub const USER_RENAMED_EVENT_TYPE: &str = "user.renamed";

/// Event type of [`UserDeactivated`].
pub const USER_DEACTIVATED_EVENT_TYPE: &str = "user.deactivated";

/// Event type of [`UserLoggedIn`].
pub const USER_LOGGED_IN_EVENT_TYPE: &str = "user.logged_in";

/// Emitted when a user is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatedUser {
    /// The user identifier.
    pub user_id: Uuid,
    /// The chosen username.
    pub username: String,
}

impl EventShape for CreatedUser {
    const DESCRIPTOR: &'static EventDescriptor = &EventDescriptor {
        kind: CREATED_USER_EVENT_TYPE,
        ancestors: &[&[USER_EVENT_KIND]],
        members: &[
            Member {
                name: "user_id",
                kind: MemberKind::Field("Uuid"),
            },
            Member {
                name: "username",
                kind: MemberKind::Field("String"),
            },
        ],
    };
}

/// Emitted when a user changes username.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRenamed {
    /// The previous username.
    pub previous: String,
    /// The new username.
    pub username: String,
}

impl EventShape for UserRenamed {
    const DESCRIPTOR: &'static EventDescriptor = &EventDescriptor {
        kind: USER_RENAMED_EVENT_TYPE,
        ancestors: &[&[USER_EVENT_KIND]],
        members: &[
            Member {
                name: "previous",
                kind: MemberKind::Field("String"),
            },
            Member {
                name: "username",
                kind: MemberKind::Field("String"),
            },
        ],
    };
}

/// Emitted when a user is deactivated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDeactivated {
    /// Free-form reason.
    pub reason: String,
}

impl EventShape for UserDeactivated {
    const DESCRIPTOR: &'static EventDescriptor = &EventDescriptor {
        kind: USER_DEACTIVATED_EVENT_TYPE,
        ancestors: &[&[USER_EVENT_KIND]],
        members: &[Member {
            name: "reason",
            kind: MemberKind::Field("String"),
        }],
    };
}

/// Emitted when a user logs in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserLoggedIn {
    /// Where the login came from, e.g. `web` or `cli`.
    pub source: String,
}

impl EventShape for UserLoggedIn {
    const DESCRIPTOR: &'static EventDescriptor = &EventDescriptor {
        kind: USER_LOGGED_IN_EVENT_TYPE,
        ancestors: &[&[USER_ACTIVITY_KIND], &[USER_EVENT_KIND]],
        members: &[Member {
            name: "source",
            kind: MemberKind::Field("String"),
        }],
    };
}
