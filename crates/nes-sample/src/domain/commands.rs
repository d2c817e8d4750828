//! Commands for the user-management context.

use nes_core::command::Command;
use uuid::Uuid;

/// Command to create a new user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user identifier.
    pub user_id: Uuid,
    /// The chosen username.
    pub username: String,
}

/// Command to rename a user.
#[derive(Debug, Clone)]
pub struct RenameUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user identifier.
    pub user_id: Uuid,
    /// The new username.
    pub username: String,
}

/// Command to deactivate a user.
#[derive(Debug, Clone)]
pub struct DeactivateUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user identifier.
    pub user_id: Uuid,
    /// Free-form reason.
    pub reason: String,
}

/// Command to record a user login.
#[derive(Debug, Clone)]
pub struct RecordLogin {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user identifier.
    pub user_id: Uuid,
    /// Where the login came from.
    pub source: String,
}

macro_rules! impl_command {
    ($($command:ty => $name:literal),+ $(,)?) => {
        $(
            impl Command for $command {
                fn command_type(&self) -> &'static str {
                    $name
                }

                fn correlation_id(&self) -> Uuid {
                    self.correlation_id
                }

                fn aggregate_id(&self) -> Uuid {
                    self.user_id
                }
            }
        )+
    };
}

impl_command! {
    CreateUser => "user.create",
    RenameUser => "user.rename",
    DeactivateUser => "user.deactivate",
    RecordLogin => "user.record_login",
}
