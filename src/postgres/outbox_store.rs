use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::PgDatabase;
use crate::error::PersistenceError;
use crate::outbox::{OutboxMessage, OutboxStore};

const COLUMNS: &str = "id, occurred_on_utc, event_type, event_data, processed_on_utc, error";

fn to_message(row: &PgRow) -> Result<OutboxMessage, PersistenceError> {
    Ok(OutboxMessage {
        id: row.try_get("id")?,
        occurred_on_utc: row.try_get("occurred_on_utc")?,
        event_type: row.try_get("event_type")?,
        event_data: row.try_get("event_data")?,
        processed_on_utc: row.try_get("processed_on_utc")?,
        error: row.try_get("error")?,
    })
}

fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl OutboxStore for PgDatabase {
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>, PersistenceError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM outbox_messages \
             WHERE processed_on_utc IS NULL AND error IS NULL \
             ORDER BY occurred_on_utc \
             LIMIT $1"
        ))
        .bind(to_limit(limit))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(to_message).collect()
    }

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            r"
            UPDATE outbox_messages SET processed_on_utc = $2
            WHERE id = $1 AND processed_on_utc IS NULL AND error IS NULL
            ",
        )
        .bind(id)
        .bind(at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            r"
            UPDATE outbox_messages SET error = $2
            WHERE id = $1 AND processed_on_utc IS NULL AND error IS NULL
            ",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn requeue_failed(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            r"
            UPDATE outbox_messages SET error = NULL
            WHERE id = $1 AND processed_on_utc IS NULL AND error IS NOT NULL
            ",
        )
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_failed(&self, limit: usize) -> Result<Vec<OutboxMessage>, PersistenceError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM outbox_messages \
             WHERE processed_on_utc IS NULL AND error IS NOT NULL \
             ORDER BY occurred_on_utc \
             LIMIT $1"
        ))
        .bind(to_limit(limit))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(to_message).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<OutboxMessage>, PersistenceError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM outbox_messages WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(to_message).transpose()
    }

    async fn pending_count(&self) -> Result<u64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM outbox_messages WHERE processed_on_utc IS NULL AND error IS NULL",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn purge_processed(&self, before: DateTime<Utc>) -> Result<u64, PersistenceError> {
        let result = sqlx::query("DELETE FROM outbox_messages WHERE processed_on_utc < $1")
            .bind(before)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
