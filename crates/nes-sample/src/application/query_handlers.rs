//! Query handlers for the user-management context.

use nes_core::aggregate::EventSourced;
use nes_core::error::DomainError;
use nes_core::unit_of_work::Repository;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers::user_stream;
use crate::domain::aggregates::UserAggregate;

/// Read-only view of a user aggregate.
#[derive(Debug, Serialize)]
pub struct UserView {
    /// The user identifier.
    pub user_id: Uuid,
    /// Bucket of the user's stream.
    pub bucket_id: Option<String>,
    /// Current username.
    pub username: String,
    /// Whether the user is active.
    pub active: bool,
    /// Number of recorded activity events.
    pub activity_count: u64,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a user by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the stream is empty, and the
/// load errors of [`Repository::load`].
pub async fn get_user_by_id(
    user_id: Uuid,
    bucket_id: Option<&str>,
    repository: &Repository,
) -> Result<UserView, DomainError> {
    let user = repository
        .load::<UserAggregate>(&user_stream(user_id, bucket_id))
        .await?;
    Ok(UserView {
        user_id,
        bucket_id: user.bucket_id().map(str::to_owned),
        username: user.username.clone(),
        active: user.active,
        activity_count: user.activity_count,
        version: user.version(),
    })
}
