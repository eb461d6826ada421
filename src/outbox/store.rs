use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::OutboxMessage;
use crate::error::PersistenceError;

/// Read and transition access to persisted outbox rows.
///
/// Each transition method applies to a single row and is durable when it
/// returns `Ok`. The `bool` reports whether the row was in the required
/// source state; `Ok(false)` means nothing changed.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Pending rows, oldest `occurred_on_utc` first, at most `limit` of them.
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>, PersistenceError>;

    /// Pending → processed.
    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, PersistenceError>;

    /// Pending → failed.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, PersistenceError>;

    /// Failed → pending. The only way out of the failed state.
    async fn requeue_failed(&self, id: Uuid) -> Result<bool, PersistenceError>;

    async fn list_failed(&self, limit: usize) -> Result<Vec<OutboxMessage>, PersistenceError>;

    async fn get(&self, id: Uuid) -> Result<Option<OutboxMessage>, PersistenceError>;

    async fn pending_count(&self) -> Result<u64, PersistenceError>;

    /// Delete processed rows whose `processed_on_utc` is before `before`.
    async fn purge_processed(&self, before: DateTime<Utc>) -> Result<u64, PersistenceError>;
}
