use std::fmt;

use uuid::Uuid;

use crate::event::{DomainEvent, RaisedEvent};

/// Identity, version, and pending domain events of an aggregate.
///
/// Events are kept in raise order until the unit of work drains them with
/// [`take_domain_events`](Entity::take_domain_events). Draining needs
/// `&mut self`, so no other holder can observe a half-drained list; an
/// instance is still meant to be owned by one request at a time.
pub struct Entity {
    id: Uuid,
    version: u64,
    events: Vec<Box<dyn RaisedEvent>>,
}

impl Default for Entity {
    fn default() -> Self {
        Entity::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("events", &self.events)
            .finish()
    }
}

impl Entity {
    pub fn new() -> Self {
        Entity::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Entity {
            id,
            version: 0,
            events: Vec::new(),
        }
    }

    /// Rebuild an entity that was loaded from storage at `version`.
    pub fn loaded(id: Uuid, version: u64) -> Self {
        Entity {
            id,
            version,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Version of the stored row this instance was loaded from; 0 if never saved.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_new(&self) -> bool {
        self.version == 0
    }

    /// Called by the unit of work after a successful commit.
    pub fn mark_persisted(&mut self) {
        self.version += 1;
    }

    pub fn raise<E: DomainEvent>(&mut self, event: E) {
        self.events.push(Box::new(event));
    }

    pub fn domain_events(&self) -> &[Box<dyn RaisedEvent>] {
        &self.events
    }

    pub fn has_domain_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Read and clear the pending events in one step.
    pub fn take_domain_events(&mut self) -> Vec<Box<dyn RaisedEvent>> {
        std::mem::take(&mut self.events)
    }

    pub fn clear_domain_events(&mut self) {
        self.events.clear();
    }
}
