//! The users bounded context.

mod error;
mod events;
mod handlers;
mod repository;
mod service;
mod user;
mod values;

pub use error::UserError;
pub use events::{register_events, UserCreated, UserRenamed};
pub use handlers::{subscribe_logging, LogUserEvents};
pub use repository::{InMemoryUserRepository, UserRepository, EMAIL_UNIQUE_CONSTRAINT, USERS_TABLE};
pub use service::UserService;
pub use user::{User, UserRecord};
pub use values::{Email, FirebaseId, Name};
