//! Sample entry point: creates a user, renames it, records a login and
//! prints the resulting view.

use std::error::Error;
use std::sync::Arc;

use nes_core::clock::SystemClock;
use nes_core::runtime::EventRuntime;
use nes_core::unit_of_work::Repository;
use nes_event_store::PgEventRepository;
use nes_event_store::schema::ensure_schema;
use nes_sample::application::{command_handlers, query_handlers};
use nes_sample::config::AppConfig;
use nes_sample::domain::commands::{CreateUser, RecordLogin, RenameUser};
use nes_sample::infrastructure::publisher::TracingEventPublisher;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting nes sample");

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    ensure_schema(&pool).await?;

    let repository = Repository::new(
        EventRuntime::shared(),
        Arc::new(PgEventRepository::new(pool)),
        Arc::new(TracingEventPublisher),
        Arc::new(SystemClock),
    )
    .with_snapshot_policy(config.snapshot_policy());
    let bucket_id = config.bucket_id.as_deref();

    let user_id = Uuid::now_v7();
    command_handlers::handle_create_user(
        &CreateUser {
            correlation_id: Uuid::now_v7(),
            user_id,
            username: "alice".to_owned(),
        },
        bucket_id,
        &repository,
    )
    .await?;
    command_handlers::handle_rename_user(
        &RenameUser {
            correlation_id: Uuid::now_v7(),
            user_id,
            username: "alice.liddell".to_owned(),
        },
        bucket_id,
        &repository,
    )
    .await?;
    command_handlers::handle_record_login(
        &RecordLogin {
            correlation_id: Uuid::now_v7(),
            user_id,
            source: "cli".to_owned(),
        },
        bucket_id,
        &repository,
    )
    .await?;

    let view = query_handlers::get_user_by_id(user_id, bucket_id, &repository).await?;
    tracing::info!(
        user_id = %view.user_id,
        username = %view.username,
        version = view.version,
        activity_count = view.activity_count,
        "user ready"
    );
    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
