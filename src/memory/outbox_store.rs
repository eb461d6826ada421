use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::InMemoryDatabase;
use crate::error::PersistenceError;
use crate::outbox::{OutboxMessage, OutboxStore};

impl InMemoryDatabase {
    fn with_outbox<T>(&self, f: impl FnOnce(&mut Vec<OutboxMessage>) -> T) -> Result<T, PersistenceError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| PersistenceError::LockPoisoned("outbox write"))?;
        Ok(f(&mut tables.outbox))
    }
}

#[async_trait]
impl OutboxStore for InMemoryDatabase {
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>, PersistenceError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("outbox read"))?;
        let mut pending: Vec<_> = tables.outbox.iter().filter(|m| m.is_pending()).cloned().collect();
        pending.sort_by_key(|m| m.occurred_on_utc);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, PersistenceError> {
        self.with_outbox(|outbox| {
            outbox
                .iter_mut()
                .find(|m| m.id == id)
                .is_some_and(|m| m.complete(at))
        })
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, PersistenceError> {
        self.with_outbox(|outbox| {
            outbox
                .iter_mut()
                .find(|m| m.id == id)
                .is_some_and(|m| m.fail(error))
        })
    }

    async fn requeue_failed(&self, id: Uuid) -> Result<bool, PersistenceError> {
        self.with_outbox(|outbox| {
            outbox
                .iter_mut()
                .find(|m| m.id == id)
                .is_some_and(OutboxMessage::requeue)
        })
    }

    async fn list_failed(&self, limit: usize) -> Result<Vec<OutboxMessage>, PersistenceError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("outbox read"))?;
        let mut failed: Vec<_> = tables.outbox.iter().filter(|m| m.is_failed()).cloned().collect();
        failed.sort_by_key(|m| m.occurred_on_utc);
        failed.truncate(limit);
        Ok(failed)
    }

    async fn get(&self, id: Uuid) -> Result<Option<OutboxMessage>, PersistenceError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("outbox read"))?;
        Ok(tables.outbox.iter().find(|m| m.id == id).cloned())
    }

    async fn pending_count(&self) -> Result<u64, PersistenceError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("outbox read"))?;
        Ok(tables.outbox.iter().filter(|m| m.is_pending()).count() as u64)
    }

    async fn purge_processed(&self, before: DateTime<Utc>) -> Result<u64, PersistenceError> {
        self.with_outbox(|outbox| {
            let len = outbox.len();
            outbox.retain(|m| !m.processed_on_utc.is_some_and(|at| at < before));
            (len - outbox.len()) as u64
        })
    }
}
