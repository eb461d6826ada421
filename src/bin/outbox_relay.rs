//! Relay host: polls the Postgres outbox and delivers rows to in-process
//! subscribers until interrupted.
//!
//! Usage: `outbox-relay [CONFIG_PATH]`

use std::sync::Arc;

use outbox_relay::postgres::{ensure_schema, PgDatabase};
use outbox_relay::{telemetry, users, AppConfig, EventRegistry, InProcessBus, OutboxProcessor, OutboxScheduler};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let path = std::env::args().nth(1);
    let config = AppConfig::load(path.as_deref())?;

    let db = PgDatabase::connect(&config.database).await?;
    ensure_schema(db.pool()).await?;

    if !config.outbox.enabled {
        warn!("outbox processing disabled; exiting");
        return Ok(());
    }

    let mut registry = EventRegistry::new();
    users::register_events(&mut registry);

    let mut bus = InProcessBus::new();
    users::subscribe_logging(&mut bus);

    let processor = OutboxProcessor::new(db, bus, Arc::new(registry))
        .with_batch_size(config.outbox.batch_size);
    let scheduler = OutboxScheduler::spawn(processor, config.outbox.poll_interval());

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    let stats = scheduler.stop().await;
    info!(
        polls = stats.polls,
        processed = stats.messages_processed,
        failed = stats.messages_failed,
        fetch_errors = stats.fetch_errors,
        "outbox relay stopped"
    );
    Ok(())
}
