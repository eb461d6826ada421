use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::PersistenceError;
use crate::outbox::OutboxMessage;
use crate::uow::{Database, Session};

/// Postgres backend over a shared connection pool.
#[derive(Clone, Debug)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] if no connection can be opened.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        info!(max_connections = config.max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Session = PgSession;

    async fn begin(&self) -> Result<PgSession, PersistenceError> {
        let tx = self.pool.begin().await?;
        Ok(PgSession {
            tx,
            written: 0,
            written_ids: HashSet::new(),
        })
    }
}

/// A Postgres transaction. Statements run as they are staged; none of them
/// are visible outside until commit.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
    written: usize,
    written_ids: HashSet<Uuid>,
}

impl PgSession {
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Record that a repository wrote `rows` rows for the entity `id`.
    pub fn record_write(&mut self, id: Uuid, rows: u64) {
        self.written += rows as usize;
        if rows > 0 {
            self.written_ids.insert(id);
        }
    }
}

#[async_trait]
impl Session for PgSession {
    async fn stage_outbox(&mut self, messages: Vec<OutboxMessage>) -> Result<(), PersistenceError> {
        for message in &messages {
            sqlx::query(
                r"
                INSERT INTO outbox_messages (id, occurred_on_utc, event_type, event_data)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(message.id)
            .bind(message.occurred_on_utc)
            .bind(&message.event_type)
            .bind(&message.event_data)
            .execute(&mut *self.tx)
            .await?;
        }
        self.written += messages.len();
        Ok(())
    }

    fn has_write_for(&self, id: Uuid) -> bool {
        self.written_ids.contains(&id)
    }

    async fn commit(self) -> Result<usize, PersistenceError> {
        self.tx.commit().await?;
        Ok(self.written)
    }

    async fn rollback(self) -> Result<(), PersistenceError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
