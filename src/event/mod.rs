mod domain_event;
mod registry;

pub use domain_event::{DomainEvent, RaisedEvent};
pub use registry::{DecodeError, DecodedEvent, EventRegistry};
