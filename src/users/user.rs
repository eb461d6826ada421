use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Email, FirebaseId, Name, UserCreated, UserRenamed};
use crate::entity::Entity;
use crate::impl_aggregate;

#[derive(Debug)]
pub struct User {
    entity: Entity,
    email: Email,
    name: Name,
    firebase_id: FirebaseId,
    created_on_utc: DateTime<Utc>,
    modified_on_utc: Option<DateTime<Utc>>,
}

impl_aggregate!(User, entity);

impl User {
    /// Create a new user at `created_on_utc` and raise [`UserCreated`].
    pub fn create(email: Email, name: Name, firebase_id: FirebaseId, created_on_utc: DateTime<Utc>) -> Self {
        let mut user = User {
            entity: Entity::new(),
            email,
            name,
            firebase_id,
            created_on_utc,
            modified_on_utc: None,
        };
        let user_id = user.entity.id();
        user.entity.raise(UserCreated { user_id });
        user
    }

    /// Raises [`UserRenamed`] unless the name is unchanged.
    pub fn rename(&mut self, name: Name) {
        if self.name == name {
            return;
        }
        self.name = name;
        let event = UserRenamed {
            user_id: self.entity.id(),
            name: self.name.to_string(),
        };
        self.entity.raise(event);
    }

    /// Stamp the time of the latest change to an already stored user.
    pub fn mark_modified(&mut self, at: DateTime<Utc>) {
        self.modified_on_utc = Some(at);
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn firebase_id(&self) -> &FirebaseId {
        &self.firebase_id
    }

    pub fn created_on_utc(&self) -> DateTime<Utc> {
        self.created_on_utc
    }

    pub fn modified_on_utc(&self) -> Option<DateTime<Utc>> {
        self.modified_on_utc
    }

    pub fn version(&self) -> u64 {
        self.entity.version()
    }

    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            id: self.entity.id(),
            email: self.email.clone(),
            name: self.name.clone(),
            firebase_id: self.firebase_id.clone(),
            created_on_utc: self.created_on_utc,
            modified_on_utc: self.modified_on_utc,
        }
    }

    /// Rebuild a user loaded from storage at `version`. Raises nothing.
    pub fn from_record(record: UserRecord, version: u64) -> Self {
        User {
            entity: Entity::loaded(record.id, version),
            email: record.email,
            name: record.name,
            firebase_id: record.firebase_id,
            created_on_utc: record.created_on_utc,
            modified_on_utc: record.modified_on_utc,
        }
    }
}

/// Persisted shape of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: Email,
    pub name: Name,
    pub firebase_id: FirebaseId,
    pub created_on_utc: DateTime<Utc>,
    #[serde(default)]
    pub modified_on_utc: Option<DateTime<Utc>>,
}
