//! Postgres backend (feature `postgres`).

mod database;
mod outbox_store;
mod schema;
mod user_repository;

pub use database::{PgDatabase, PgSession};
pub use schema::ensure_schema;
pub use user_repository::PgUserRepository;
