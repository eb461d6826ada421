use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::PgSession;
use crate::error::PersistenceError;
use crate::users::{Email, FirebaseId, Name, User, UserRecord, UserRepository};

const COLUMNS: &str = "id, email, name, firebase_id, version, created_on_utc, modified_on_utc";
use crate::Aggregate;

#[derive(Debug, Default, Clone, Copy)]
pub struct PgUserRepository;

impl PgUserRepository {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_one_by(
        session: &mut PgSession,
        column: &'static str,
        value: &str,
    ) -> Result<Option<User>, PersistenceError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM users WHERE {column} = $1"))
        .bind(value)
        .fetch_optional(session.connection())
        .await?;
        row.as_ref().map(to_user).transpose()
    }
}

fn to_user(row: &PgRow) -> Result<User, PersistenceError> {
    let corrupt = |err: crate::users::UserError| PersistenceError::Corrupt(err.to_string());
    let record = UserRecord {
        id: row.try_get("id")?,
        email: Email::parse(row.try_get("email")?).map_err(corrupt)?,
        name: Name::parse(row.try_get("name")?).map_err(corrupt)?,
        firebase_id: FirebaseId::parse(row.try_get("firebase_id")?).map_err(corrupt)?,
        created_on_utc: row.try_get("created_on_utc")?,
        modified_on_utc: row.try_get("modified_on_utc")?,
    };
    let version: i64 = row.try_get("version")?;
    Ok(User::from_record(record, version.max(0) as u64))
}

#[async_trait]
impl UserRepository<PgSession> for PgUserRepository {
    async fn get_by_id(&self, session: &mut PgSession, id: Uuid) -> Result<Option<User>, PersistenceError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(session.connection())
            .await?;
        row.as_ref().map(to_user).transpose()
    }

    async fn get_by_email(&self, session: &mut PgSession, email: &Email) -> Result<Option<User>, PersistenceError> {
        Self::fetch_one_by(session, "email", email.as_str()).await
    }

    async fn get_by_firebase_id(
        &self,
        session: &mut PgSession,
        firebase_id: &FirebaseId,
    ) -> Result<Option<User>, PersistenceError> {
        Self::fetch_one_by(session, "firebase_id", firebase_id.as_str()).await
    }

    async fn save(&self, session: &mut PgSession, user: &User) -> Result<(), PersistenceError> {
        let expected = user.version() as i64;

        if user.version() == 0 {
            let result = sqlx::query(
                r"
                INSERT INTO users (id, email, name, firebase_id, version, created_on_utc, modified_on_utc)
                VALUES ($1, $2, $3, $4, 1, $5, $6)
                ",
            )
            .bind(user.id())
            .bind(user.email().as_str())
            .bind(user.name().as_str())
            .bind(user.firebase_id().as_str())
            .bind(user.created_on_utc())
            .bind(user.modified_on_utc())
            .execute(session.connection())
            .await?;
            session.record_write(user.id(), result.rows_affected());
            return Ok(());
        }

        let result = sqlx::query(
            r"
            UPDATE users
            SET email = $3, name = $4, firebase_id = $5, modified_on_utc = $6, version = version + 1
            WHERE id = $1 AND version = $2
            ",
        )
        .bind(user.id())
        .bind(expected)
        .bind(user.email().as_str())
        .bind(user.name().as_str())
        .bind(user.firebase_id().as_str())
        .bind(user.modified_on_utc())
        .execute(session.connection())
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<(i64,)> = sqlx::query_as("SELECT version FROM users WHERE id = $1")
                .bind(user.id())
                .fetch_optional(session.connection())
                .await?;
            return Err(PersistenceError::ConcurrentWrite {
                id: format!("users/{}", user.id()),
                expected: user.version(),
                actual: actual.map_or(0, |(v,)| v.max(0) as u64),
            });
        }

        session.record_write(user.id(), result.rows_affected());
        Ok(())
    }
}
