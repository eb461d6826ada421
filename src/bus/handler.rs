use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event::{DecodedEvent, DomainEvent};

/// Where a delivered event came from.
///
/// Delivery is at-least-once; `message_id` is stable across redeliveries of
/// the same outbox row and is the key handlers should deduplicate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryContext {
    pub message_id: Uuid,
    pub occurred_on_utc: DateTime<Utc>,
    pub event_type: String,
}

impl From<&DecodedEvent> for DeliveryContext {
    fn from(event: &DecodedEvent) -> Self {
        Self {
            message_id: event.message_id,
            occurred_on_utc: event.occurred_on_utc,
            event_type: event.event_type.clone(),
        }
    }
}

/// An in-process subscriber for one event type.
#[async_trait]
pub trait EventHandler<E: DomainEvent>: Send + Sync + 'static {
    async fn handle(&self, event: &E, ctx: &DeliveryContext) -> anyhow::Result<()>;
}
