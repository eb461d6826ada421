use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::DomainEvent;
use crate::outbox::OutboxMessage;

type Decoder = Box<
    dyn Fn(&serde_json::Value) -> Result<Arc<dyn Any + Send + Sync>, serde_json::Error>
        + Send
        + Sync,
>;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("failed to deserialize '{event_type}': {source}")]
    Deserialize {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An outbox row decoded back into its concrete event.
#[derive(Clone)]
pub struct DecodedEvent {
    pub message_id: Uuid,
    pub occurred_on_utc: DateTime<Utc>,
    pub event_type: String,
    payload: Arc<dyn Any + Send + Sync>,
}

impl DecodedEvent {
    pub fn new<E: DomainEvent>(message_id: Uuid, occurred_on_utc: DateTime<Utc>, event: E) -> Self {
        Self {
            message_id,
            occurred_on_utc,
            event_type: E::EVENT_TYPE.to_string(),
            payload: Arc::new(event),
        }
    }

    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }
}

impl fmt::Debug for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedEvent")
            .field("message_id", &self.message_id)
            .field("occurred_on_utc", &self.occurred_on_utc)
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

/// Maps stable event-type keys to JSON decoders.
///
/// Populated once at startup with every event kind the application raises.
/// A row whose key is missing here fails with [`DecodeError::UnknownEventType`].
#[derive(Default)]
pub struct EventRegistry {
    decoders: HashMap<&'static str, Decoder>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: DomainEvent>(&mut self) -> &mut Self {
        self.decoders.insert(
            E::EVENT_TYPE,
            Box::new(|value: &serde_json::Value| {
                let event = <E as serde::Deserialize>::deserialize(value)?;
                Ok(Arc::new(event) as Arc<dyn Any + Send + Sync>)
            }),
        );
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<E: DomainEvent>(mut self) -> Self {
        self.register::<E>();
        self
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn decode(&self, message: &OutboxMessage) -> Result<DecodedEvent, DecodeError> {
        let decoder = self
            .decoders
            .get(message.event_type.as_str())
            .ok_or_else(|| DecodeError::UnknownEventType(message.event_type.clone()))?;

        let payload = decoder(&message.event_data).map_err(|source| DecodeError::Deserialize {
            event_type: message.event_type.clone(),
            source,
        })?;

        Ok(DecodedEvent {
            message_id: message.id,
            occurred_on_utc: message.occurred_on_utc,
            event_type: message.event_type.clone(),
            payload,
        })
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.decoders.keys().collect();
        keys.sort();
        f.debug_struct("EventRegistry").field("event_types", &keys).finish()
    }
}
