use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// An immutable fact raised by an aggregate mutation.
///
/// `EVENT_TYPE` is the stable key written to the outbox and looked up in the
/// [`EventRegistry`](super::EventRegistry) when the row is delivered. Renaming
/// the Rust type is safe; changing the key orphans rows already written.
///
/// ```
/// use outbox_relay::DomainEvent;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct OrderShipped {
///     order_id: u64,
/// }
///
/// impl DomainEvent for OrderShipped {
///     const EVENT_TYPE: &'static str = "orders.order_shipped";
/// }
/// ```
pub trait DomainEvent: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {
    const EVENT_TYPE: &'static str;
}

/// Type-erased view of a raised event, as held by an [`Entity`](crate::Entity).
///
/// Serialization is deferred until dispatch so a failure there can abort the
/// enclosing save.
pub trait RaisedEvent: fmt::Debug + Send + Sync {
    fn event_type(&self) -> &'static str;

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;

    fn as_any(&self) -> &dyn Any;
}

impl<E: DomainEvent> RaisedEvent for E {
    fn event_type(&self) -> &'static str {
        E::EVENT_TYPE
    }

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn RaisedEvent {
    /// Downcast to the concrete event type.
    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}
