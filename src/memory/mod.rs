//! In-memory backend for tests and single-process use.

mod database;
mod outbox_store;

pub use database::{Document, InMemoryDatabase, InMemorySession};
