use thiserror::Error;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::uow::SaveError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("name must not be empty")]
    EmptyName,

    #[error("firebase id must not be empty")]
    EmptyFirebaseId,

    #[error("email '{0}' is already in use")]
    EmailNotUnique(String),

    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
