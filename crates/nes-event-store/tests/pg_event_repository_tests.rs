//! Integration tests for `PgEventRepository`.
//!
//! These need a Postgres server; run them with
//! `DATABASE_URL=... cargo test -p nes-event-store -- --ignored`.

use chrono::Utc;
use nes_core::error::DomainError;
use nes_core::repository::{EventRepository, StoredEvent, StoredSnapshot, StreamId};
use nes_event_store::PgEventRepository;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build a `StoredEvent` with sensible defaults.
fn make_stored_event(stream: &StreamId, sequence_number: i64) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        aggregate_id: stream.aggregate_id,
        bucket_id: stream.bucket_id.clone(),
        event_type: "user.renamed".to_string(),
        payload: serde_json::json!({"username": "alice"}),
        sequence_number,
        correlation_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        occurred_at: Utc::now(),
    }
}

fn make_snapshot(stream: &StreamId, version: i64) -> StoredSnapshot {
    StoredSnapshot {
        aggregate_id: stream.aggregate_id,
        bucket_id: stream.bucket_id.clone(),
        version,
        payload: serde_json::json!({"id": stream.aggregate_id, "version": version}),
        taken_at: Utc::now(),
    }
}

// --- load_events ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_load_events_returns_empty_vec_for_nonexistent_stream(pool: PgPool) {
    let repo = PgEventRepository::new(pool);

    let events = repo
        .load_events(&StreamId::new(Uuid::new_v4()), 0)
        .await
        .unwrap();

    assert!(events.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_and_load_single_event(pool: PgPool) {
    // Arrange
    let repo = PgEventRepository::new(pool);
    let stream = StreamId::in_bucket(Uuid::new_v4(), "tenant-a");
    let event = make_stored_event(&stream, 1);
    let expected = event.clone();

    // Act
    repo.append_events(&stream, 0, &[event]).await.unwrap();
    let loaded = repo.load_events(&stream, 0).await.unwrap();

    // Assert
    assert_eq!(loaded.len(), 1);
    let e = &loaded[0];
    assert_eq!(e.event_id, expected.event_id);
    assert_eq!(e.aggregate_id, stream.aggregate_id);
    assert_eq!(e.bucket_id.as_deref(), Some("tenant-a"));
    assert_eq!(e.event_type, expected.event_type);
    assert_eq!(e.payload, expected.payload);
    assert_eq!(e.sequence_number, 1);
    assert_eq!(e.correlation_id, expected.correlation_id);
    assert_eq!(e.causation_id, expected.causation_id);
    assert_eq!(
        e.occurred_at.timestamp_micros(),
        expected.occurred_at.timestamp_micros()
    );
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_load_events_after_version_returns_tail_in_order(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let stream = StreamId::new(Uuid::new_v4());
    let events: Vec<_> = (1..=4).map(|n| make_stored_event(&stream, n)).collect();
    repo.append_events(&stream, 0, &events).await.unwrap();

    let tail = repo.load_events(&stream, 2).await.unwrap();

    let sequence: Vec<i64> = tail.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequence, [3, 4]);
    assert!(tail.iter().all(|e| e.bucket_id.is_none()));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_buckets_isolate_streams_of_the_same_aggregate(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let id = Uuid::new_v4();
    let plain = StreamId::new(id);
    let bucketed = StreamId::in_bucket(id, "tenant-b");

    repo.append_events(&plain, 0, &[make_stored_event(&plain, 1)])
        .await
        .unwrap();
    repo.append_events(&bucketed, 0, &[make_stored_event(&bucketed, 1)])
        .await
        .unwrap();

    assert_eq!(repo.load_events(&plain, 0).await.unwrap().len(), 1);
    assert_eq!(repo.load_events(&bucketed, 0).await.unwrap().len(), 1);
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_stale_expected_version_is_a_conflict(pool: PgPool) {
    // Arrange
    let repo = PgEventRepository::new(pool);
    let stream = StreamId::new(Uuid::new_v4());
    repo.append_events(
        &stream,
        0,
        &[make_stored_event(&stream, 1), make_stored_event(&stream, 2)],
    )
    .await
    .unwrap();

    // Act
    let result = repo
        .append_events(&stream, 0, &[make_stored_event(&stream, 3)])
        .await;

    // Assert
    match result {
        Err(DomainError::ConcurrencyConflict(conflict)) => {
            assert_eq!(conflict.aggregate_id, stream.aggregate_id);
            assert_eq!(conflict.expected, 0);
            assert_eq!(conflict.actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert_eq!(repo.current_version(&stream).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_sequential_appends_with_correct_expected_version(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let stream = StreamId::new(Uuid::new_v4());

    repo.append_events(
        &stream,
        0,
        &[make_stored_event(&stream, 1), make_stored_event(&stream, 2)],
    )
    .await
    .unwrap();
    repo.append_events(
        &stream,
        2,
        &[make_stored_event(&stream, 3), make_stored_event(&stream, 4)],
    )
    .await
    .unwrap();

    let loaded = repo.load_events(&stream, 0).await.unwrap();
    assert_eq!(loaded.len(), 4);
    for (i, event) in loaded.iter().enumerate() {
        assert_eq!(event.sequence_number, i64::try_from(i + 1).unwrap());
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_empty_events_is_noop(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let stream = StreamId::new(Uuid::new_v4());

    repo.append_events(&stream, 0, &[]).await.unwrap();

    assert!(repo.load_events(&stream, 0).await.unwrap().is_empty());
}

// --- snapshots ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_snapshot_round_trip_keeps_latest_version(pool: PgPool) {
    // Arrange
    let repo = PgEventRepository::new(pool);
    let stream = StreamId::in_bucket(Uuid::new_v4(), "tenant-a");

    // Act
    repo.save_snapshot(make_snapshot(&stream, 5)).await.unwrap();
    repo.save_snapshot(make_snapshot(&stream, 10)).await.unwrap();
    repo.save_snapshot(make_snapshot(&stream, 7)).await.unwrap();
    let loaded = repo.load_snapshot(&stream).await.unwrap().unwrap();

    // Assert
    assert_eq!(loaded.version, 10);
    assert_eq!(loaded.bucket_id.as_deref(), Some("tenant-a"));
    assert_eq!(loaded.payload["version"], 10);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_missing_snapshot_is_none(pool: PgPool) {
    let repo = PgEventRepository::new(pool);

    let loaded = repo
        .load_snapshot(&StreamId::new(Uuid::new_v4()))
        .await
        .unwrap();

    assert!(loaded.is_none());
}
