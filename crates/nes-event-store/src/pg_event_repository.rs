//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use nes_core::error::{ConcurrencyConflict, DomainError};
use nes_core::repository::{EventRepository, StoredEvent, StoredSnapshot, StreamId};

/// PostgreSQL-backed event repository.
///
/// Streams outside any bucket are stored under the empty bucket `''`.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the last committed sequence number of a stream, 0 if empty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    pub async fn current_version(&self, stream: &StreamId) -> Result<i64, DomainError> {
        let version: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events \
             WHERE aggregate_id = $1 AND bucket_id = $2",
        )
        .bind(stream.aggregate_id)
        .bind(bucket_key(stream.bucket_id.as_deref()))
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(version)
    }
}

fn bucket_key(bucket_id: Option<&str>) -> &str {
    bucket_id.unwrap_or("")
}

fn bucket_from_key(key: String) -> Option<String> {
    if key.is_empty() { None } else { Some(key) }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

/// Version to report after `taken` turned out to be occupied. The stream is
/// at least at `taken`, which is also what gets reported when the lookup
/// itself fails.
fn observed_version(stream: &StreamId, lookup: Result<i64, DomainError>, taken: i64) -> i64 {
    match lookup {
        Ok(version) => version.max(taken),
        Err(err) => {
            warn!(stream = %stream, error = %err, "could not read version after conflicting append");
            taken
        }
    }
}

fn event_from_row(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    Ok(StoredEvent {
        event_id: row.try_get("event_id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        bucket_id: bucket_from_key(row.try_get("bucket_id")?),
        event_type: row.try_get("event_type")?,
        payload: row.try_get("payload")?,
        sequence_number: row.try_get("sequence_number")?,
        correlation_id: row.try_get("correlation_id")?,
        causation_id: row.try_get("causation_id")?,
        occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
    })
}

fn snapshot_from_row(row: &PgRow) -> Result<StoredSnapshot, sqlx::Error> {
    Ok(StoredSnapshot {
        aggregate_id: row.try_get("aggregate_id")?,
        bucket_id: bucket_from_key(row.try_get("bucket_id")?),
        version: row.try_get("version")?,
        payload: row.try_get("payload")?,
        taken_at: row.try_get("taken_at")?,
    })
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn load_events(
        &self,
        stream: &StreamId,
        after_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(
            "SELECT event_id, aggregate_id, bucket_id, event_type, payload, sequence_number, \
                    correlation_id, causation_id, occurred_at \
             FROM domain_events \
             WHERE aggregate_id = $1 AND bucket_id = $2 AND sequence_number > $3 \
             ORDER BY sequence_number",
        )
        .bind(stream.aggregate_id)
        .bind(bucket_key(stream.bucket_id.as_deref()))
        .bind(after_version)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        rows.iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(infrastructure)
    }

    async fn append_events(
        &self,
        stream: &StreamId,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        let bucket = bucket_key(stream.bucket_id.as_deref());

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let actual: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events \
             WHERE aggregate_id = $1 AND bucket_id = $2",
        )
        .bind(stream.aggregate_id)
        .bind(bucket)
        .fetch_one(&mut *tx)
        .await
        .map_err(infrastructure)?;

        if actual != expected_version {
            warn!(stream = %stream, expected_version, actual, "stale expected version");
            return Err(ConcurrencyConflict::new(stream.aggregate_id, expected_version, actual).into());
        }

        for event in events {
            let inserted = sqlx::query(
                "INSERT INTO domain_events \
                    (event_id, aggregate_id, bucket_id, event_type, payload, sequence_number, \
                     correlation_id, causation_id, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(event.event_id)
            .bind(stream.aggregate_id)
            .bind(bucket)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.sequence_number)
            .bind(event.correlation_id)
            .bind(event.causation_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    drop(tx);
                    let actual = observed_version(
                        stream,
                        self.current_version(stream).await,
                        event.sequence_number,
                    );
                    warn!(stream = %stream, expected_version, actual, "sequence number already taken");
                    return Err(ConcurrencyConflict::new(stream.aggregate_id, expected_version, actual)
                        .with_message(format!(
                            "concurrent append to {stream}: sequence number {} already taken",
                            event.sequence_number
                        ))
                        .with_cause(sqlx::Error::Database(db))
                        .into());
                }
                Err(err) => return Err(infrastructure(err)),
            }
        }

        tx.commit().await.map_err(infrastructure)?;
        debug!(stream = %stream, count = events.len(), "appended events");
        Ok(())
    }

    async fn load_snapshot(&self, stream: &StreamId) -> Result<Option<StoredSnapshot>, DomainError> {
        let row = sqlx::query(
            "SELECT aggregate_id, bucket_id, version, payload, taken_at \
             FROM aggregate_snapshots \
             WHERE aggregate_id = $1 AND bucket_id = $2",
        )
        .bind(stream.aggregate_id)
        .bind(bucket_key(stream.bucket_id.as_deref()))
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        row.as_ref()
            .map(snapshot_from_row)
            .transpose()
            .map_err(infrastructure)
    }

    async fn save_snapshot(&self, snapshot: StoredSnapshot) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO aggregate_snapshots (aggregate_id, bucket_id, version, payload, taken_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (aggregate_id, bucket_id) DO UPDATE \
             SET version = EXCLUDED.version, payload = EXCLUDED.payload, taken_at = EXCLUDED.taken_at \
             WHERE aggregate_snapshots.version <= EXCLUDED.version",
        )
        .bind(snapshot.aggregate_id)
        .bind(bucket_key(snapshot.bucket_id.as_deref()))
        .bind(snapshot.version)
        .bind(&snapshot.payload)
        .bind(snapshot.taken_at)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(())
    }
}
