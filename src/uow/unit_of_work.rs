use thiserror::Error;
use tracing::{debug, warn};

use super::{Database, Session};
use crate::entity::Committable;
use crate::error::PersistenceError;
use crate::outbox::{DispatchError, DomainEventDispatcher};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("domain event serialization failed: {0}")]
    Serialization(#[source] DispatchError),

    #[error("optimistic concurrency conflict: {0}")]
    Concurrency(#[source] PersistenceError),

    #[error("persistence failed: {0}")]
    Persistence(#[source] PersistenceError),
}

impl From<PersistenceError> for SaveError {
    fn from(err: PersistenceError) -> Self {
        if err.is_concurrency_conflict() {
            SaveError::Concurrency(err)
        } else {
            SaveError::Persistence(err)
        }
    }
}

/// Transactional boundary around one business operation.
///
/// State writes go through [`session`](Self::session); the events the
/// changed entities raised are turned into outbox rows inside the same
/// session by [`save_changes`](Self::save_changes), so either both become
/// durable or neither does.
///
/// ```ignore
/// let mut uow = UnitOfWork::begin(&db, &dispatcher).await?;
/// users.save(uow.session(), &user).await?;
/// uow.save_changes(&mut user).await?;
/// ```
pub struct UnitOfWork<'d, S> {
    session: S,
    dispatcher: &'d DomainEventDispatcher,
}

impl<'d, S: Session> UnitOfWork<'d, S> {
    pub async fn begin<D>(db: &D, dispatcher: &'d DomainEventDispatcher) -> Result<Self, PersistenceError>
    where
        D: Database<Session = S>,
    {
        let session = db.begin().await?;
        Ok(Self {
            session,
            dispatcher,
        })
    }

    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }

    /// Dispatch pending events from `changes`, then commit.
    ///
    /// On success each entity in `changes` that had a state write staged on
    /// the session has its version advanced. Entities that only raised
    /// events keep their version.
    ///
    /// # Errors
    ///
    /// - [`SaveError::Serialization`] if an event could not be serialized;
    ///   the session is rolled back and nothing is written.
    /// - [`SaveError::Concurrency`] if a staged write lost a version race.
    /// - [`SaveError::Persistence`] for any other storage failure.
    pub async fn save_changes<C>(mut self, changes: &mut C) -> Result<usize, SaveError>
    where
        C: Committable + ?Sized,
    {
        let mut entities = changes.entities_mut();

        let dispatch = self
            .dispatcher
            .dispatch_and_clear_all(&mut entities, &mut self.session)
            .await;

        let dispatched = match dispatch {
            Ok(count) => count,
            Err(err) => {
                if let Err(rollback_err) = self.session.rollback().await {
                    warn!(error = %rollback_err, "rollback after dispatch failure failed");
                }
                return Err(match err {
                    DispatchError::Persistence(inner) => SaveError::from(inner),
                    other => SaveError::Serialization(other),
                });
            }
        };

        let staged: Vec<bool> = entities
            .iter()
            .map(|entity| self.session.has_write_for(entity.id()))
            .collect();
        let written = self.session.commit().await?;

        for (entity, staged) in entities.iter_mut().zip(staged) {
            if staged {
                entity.mark_persisted();
            }
        }

        debug!(written, dispatched, "unit of work committed");
        Ok(written)
    }

    pub async fn rollback(self) -> Result<(), PersistenceError> {
        self.session.rollback().await
    }
}
