use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::OutboxMessage;
use crate::clock::{Clock, SystemClock};
use crate::entity::Entity;
use crate::error::PersistenceError;
use crate::event::RaisedEvent;
use crate::uow::Session;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to serialize '{event_type}': {source}")]
    Serialization {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Turns raised domain events into outbox rows staged on a session.
#[derive(Clone)]
pub struct DomainEventDispatcher {
    clock: Arc<dyn Clock>,
}

impl Default for DomainEventDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for DomainEventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainEventDispatcher").finish_non_exhaustive()
    }
}

impl DomainEventDispatcher {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Stage one outbox row per event, in order.
    ///
    /// Every event is serialized before anything is staged, so a failure
    /// leaves the session untouched. Returns the number of rows staged.
    pub async fn dispatch_events<S: Session>(
        &self,
        events: Vec<Box<dyn RaisedEvent>>,
        session: &mut S,
    ) -> Result<usize, DispatchError> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut messages = Vec::with_capacity(events.len());
        let mut last = self.clock.now();
        for event in &events {
            let event_type = event.event_type();
            let event_data = event
                .to_json()
                .map_err(|source| DispatchError::Serialization { event_type, source })?;

            // Occurrence times never go backwards within one call.
            let occurred_on_utc = self.clock.now().max(last);
            last = occurred_on_utc;

            messages.push(OutboxMessage::new(
                Uuid::new_v4(),
                occurred_on_utc,
                event_type,
                event_data,
            ));
        }

        let count = messages.len();
        for message in &messages {
            debug!(message_id = %message.id, event_type = %message.event_type, "staging outbox message");
        }
        session.stage_outbox(messages).await?;
        Ok(count)
    }

    /// Drain `entity` and dispatch what it held.
    pub async fn dispatch_and_clear<S: Session>(
        &self,
        entity: &mut Entity,
        session: &mut S,
    ) -> Result<usize, DispatchError> {
        let events = entity.take_domain_events();
        self.dispatch_events(events, session).await
    }

    /// Drain every entity, keeping per-entity order, and dispatch in one call.
    pub async fn dispatch_and_clear_all<S: Session>(
        &self,
        entities: &mut [&mut Entity],
        session: &mut S,
    ) -> Result<usize, DispatchError> {
        let events: Vec<_> = entities
            .iter_mut()
            .flat_map(|entity| entity.take_domain_events())
            .collect();
        self.dispatch_events(events, session).await
    }
}
