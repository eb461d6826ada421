use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{DomainEvent, EventRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    pub user_id: Uuid,
}

impl DomainEvent for UserCreated {
    const EVENT_TYPE: &'static str = "users.user_created";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRenamed {
    pub user_id: Uuid,
    pub name: String,
}

impl DomainEvent for UserRenamed {
    const EVENT_TYPE: &'static str = "users.user_renamed";
}

/// Register every event the users module raises.
pub fn register_events(registry: &mut EventRegistry) {
    registry.register::<UserCreated>().register::<UserRenamed>();
}
