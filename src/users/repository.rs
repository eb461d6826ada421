use async_trait::async_trait;
use uuid::Uuid;

use super::{Email, FirebaseId, User, UserRecord};
use crate::error::PersistenceError;
use crate::memory::{Document, InMemorySession};
use crate::uow::Session;
use crate::Aggregate;

/// Storage access for users within a session of backend `S`.
///
/// `save` stages an insert when the user is new and a version-checked
/// update otherwise; it becomes durable when the unit of work commits.
#[async_trait]
pub trait UserRepository<S: Session>: Send + Sync {
    async fn get_by_id(&self, session: &mut S, id: Uuid) -> Result<Option<User>, PersistenceError>;

    async fn get_by_email(&self, session: &mut S, email: &Email) -> Result<Option<User>, PersistenceError>;

    async fn get_by_firebase_id(
        &self,
        session: &mut S,
        firebase_id: &FirebaseId,
    ) -> Result<Option<User>, PersistenceError>;

    async fn is_email_unique(&self, session: &mut S, email: &Email) -> Result<bool, PersistenceError> {
        Ok(self.get_by_email(session, email).await?.is_none())
    }

    async fn save(&self, session: &mut S, user: &User) -> Result<(), PersistenceError>;
}

pub const USERS_TABLE: &str = "users";

/// Name of the unique constraint on user emails, on every backend.
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryUserRepository;

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self
    }

    fn find(
        session: &InMemorySession,
        matches: impl Fn(&UserRecord) -> bool,
    ) -> Result<Option<User>, PersistenceError> {
        for (_, document) in session.documents(USERS_TABLE)? {
            let version = document.version;
            let record = decode(document)?;
            if matches(&record) {
                return Ok(Some(User::from_record(record, version)));
            }
        }
        Ok(None)
    }
}

fn decode(document: Document) -> Result<UserRecord, PersistenceError> {
    serde_json::from_value(document.body).map_err(|err| PersistenceError::Corrupt(err.to_string()))
}

#[async_trait]
impl UserRepository<InMemorySession> for InMemoryUserRepository {
    async fn get_by_id(&self, session: &mut InMemorySession, id: Uuid) -> Result<Option<User>, PersistenceError> {
        match session.document(USERS_TABLE, id)? {
            Some(document) => {
                let version = document.version;
                Ok(Some(User::from_record(decode(document)?, version)))
            }
            None => Ok(None),
        }
    }

    async fn get_by_email(
        &self,
        session: &mut InMemorySession,
        email: &Email,
    ) -> Result<Option<User>, PersistenceError> {
        Self::find(session, |record| &record.email == email)
    }

    async fn get_by_firebase_id(
        &self,
        session: &mut InMemorySession,
        firebase_id: &FirebaseId,
    ) -> Result<Option<User>, PersistenceError> {
        Self::find(session, |record| &record.firebase_id == firebase_id)
    }

    async fn save(&self, session: &mut InMemorySession, user: &User) -> Result<(), PersistenceError> {
        let body = serde_json::to_value(user.to_record())
            .map_err(|err| PersistenceError::Corrupt(err.to_string()))?;
        session.put_unique_document(USERS_TABLE, user.id(), user.version(), body, &["email"]);
        Ok(())
    }
}
