//! Event store database schema.

use sqlx::PgPool;

/// SQL creating the events and snapshots tables. Shared with the sqlx
/// migrations so tests and the binary see the same schema.
pub const CREATE_EVENT_STORE: &str = include_str!("../../../migrations/0001_create_event_store.sql");

/// Creates the event store tables if they do not exist yet.
///
/// # Errors
///
/// Returns the database error if any statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(CREATE_EVENT_STORE).execute(pool).await?;
    Ok(())
}
