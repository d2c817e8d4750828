//! Command handlers for the user-management context.
//!
//! Each handler loads the user's stream, runs one domain method and saves
//! the resulting events through the unit of work.

use nes_core::command::Command;
use nes_core::error::DomainError;
use nes_core::repository::{StoredEvent, StreamId};
use nes_core::unit_of_work::Repository;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::UserAggregate;
use crate::domain::commands::{CreateUser, DeactivateUser, RecordLogin, RenameUser};

/// Stream of a user, optionally inside a bucket.
#[must_use]
pub fn user_stream(user_id: Uuid, bucket_id: Option<&str>) -> StreamId {
    StreamId {
        aggregate_id: user_id,
        bucket_id: bucket_id.map(str::to_owned),
    }
}

async fn execute<C: Command>(
    command: &C,
    bucket_id: Option<&str>,
    repository: &Repository,
    action: impl FnOnce(&mut UserAggregate) -> Result<(), DomainError>,
) -> Result<Vec<StoredEvent>, DomainError> {
    info!(command = command.command_type(), "handling command");

    let stream = user_stream(command.aggregate_id(), bucket_id);
    let mut user = repository.load_or_new::<UserAggregate>(&stream).await?;
    action(&mut user)?;
    repository.save(&mut user, command.correlation_id()).await
}

/// Handles the `CreateUser` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the user exists or the username is
/// blank, and store errors from loading or saving.
#[instrument(skip(command, repository), fields(user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_create_user(
    command: &CreateUser,
    bucket_id: Option<&str>,
    repository: &Repository,
) -> Result<Vec<StoredEvent>, DomainError> {
    execute(command, bucket_id, repository, |user| {
        user.create(&command.username)
    })
    .await
}

/// Handles the `RenameUser` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for unknown users,
/// `DomainError::Validation` for inactive users or blank names, and
/// `DomainError::ConcurrencyConflict` if the user changed concurrently.
#[instrument(skip(command, repository), fields(user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_rename_user(
    command: &RenameUser,
    bucket_id: Option<&str>,
    repository: &Repository,
) -> Result<Vec<StoredEvent>, DomainError> {
    execute(command, bucket_id, repository, |user| {
        user.rename(&command.username)
    })
    .await
}

/// Handles the `DeactivateUser` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for unknown users and
/// `DomainError::Validation` for users already inactive.
#[instrument(skip(command, repository), fields(user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_deactivate_user(
    command: &DeactivateUser,
    bucket_id: Option<&str>,
    repository: &Repository,
) -> Result<Vec<StoredEvent>, DomainError> {
    execute(command, bucket_id, repository, |user| {
        user.deactivate(&command.reason)
    })
    .await
}

/// Handles the `RecordLogin` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for unknown users and
/// `DomainError::Validation` for inactive users.
#[instrument(skip(command, repository), fields(user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_record_login(
    command: &RecordLogin,
    bucket_id: Option<&str>,
    repository: &Repository,
) -> Result<Vec<StoredEvent>, DomainError> {
    execute(command, bucket_id, repository, |user| {
        user.record_login(&command.source)
    })
    .await
}
