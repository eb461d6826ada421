use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::outbox::OutboxMessage;

/// One open transaction against a backend.
///
/// Repositories stage state writes through backend-specific methods on the
/// concrete session; the dispatcher stages outbox rows through
/// [`stage_outbox`](Session::stage_outbox). Nothing staged is visible to
/// other sessions until [`commit`](Session::commit) returns `Ok`.
#[async_trait]
pub trait Session: Send {
    async fn stage_outbox(&mut self, messages: Vec<OutboxMessage>) -> Result<(), PersistenceError>;

    /// Whether a state write for the entity `id` has been staged.
    fn has_write_for(&self, id: Uuid) -> bool;

    /// Apply every staged write atomically. Returns the number of rows written.
    async fn commit(self) -> Result<usize, PersistenceError>;

    async fn rollback(self) -> Result<(), PersistenceError>;
}

/// A backend that can open sessions.
#[async_trait]
pub trait Database: Send + Sync {
    type Session: Session;

    async fn begin(&self) -> Result<Self::Session, PersistenceError>;
}
