use sqlx::PgPool;
use tracing::debug;

use crate::error::PersistenceError;

const STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS outbox_messages (
        id               UUID PRIMARY KEY,
        occurred_on_utc  TIMESTAMPTZ NOT NULL,
        event_type       TEXT NOT NULL,
        event_data       JSONB NOT NULL,
        processed_on_utc TIMESTAMPTZ NULL,
        error            TEXT NULL
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS ix_outbox_messages_unprocessed
        ON outbox_messages (occurred_on_utc)
        WHERE processed_on_utc IS NULL AND error IS NULL
    ",
    r"
    CREATE TABLE IF NOT EXISTS users (
        id          UUID PRIMARY KEY,
        email       TEXT NOT NULL UNIQUE,
        name        TEXT NOT NULL,
        firebase_id TEXT NOT NULL,
        version     BIGINT NOT NULL
    )
    ",
    // Audit columns, added in place on tables created before they existed.
    r"
    ALTER TABLE users
        ADD COLUMN IF NOT EXISTS created_on_utc TIMESTAMPTZ NOT NULL DEFAULT now(),
        ADD COLUMN IF NOT EXISTS modified_on_utc TIMESTAMPTZ NULL
    ",
];

/// Create the tables and indexes if they do not exist. Safe to run on every start.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), PersistenceError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!("schema ensured");
    Ok(())
}
