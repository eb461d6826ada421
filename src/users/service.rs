use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{Email, FirebaseId, Name, User, UserError, UserRepository, EMAIL_UNIQUE_CONSTRAINT};
use crate::outbox::DomainEventDispatcher;
use crate::uow::{Database, SaveError, Session, UnitOfWork};
use crate::Aggregate;

/// Application operations on users. Each write runs in its own unit of work.
///
/// Audit timestamps come from the dispatcher's clock, so outbox rows and the
/// user row written by one operation agree on the time.
pub struct UserService<D, R> {
    db: D,
    users: R,
    dispatcher: DomainEventDispatcher,
}

impl<D, R> UserService<D, R>
where
    D: Database,
    R: UserRepository<D::Session>,
{
    pub fn new(db: D, users: R, dispatcher: DomainEventDispatcher) -> Self {
        Self {
            db,
            users,
            dispatcher,
        }
    }

    /// Validate, check email uniqueness, insert, and commit with a
    /// `UserCreated` outbox row.
    ///
    /// The up-front check gives the common case a clean error; the storage
    /// constraint decides races between concurrent creates, and both surface
    /// as [`UserError::EmailNotUnique`].
    #[instrument(skip_all)]
    pub async fn create_user(&self, email: &str, name: &str, firebase_id: &str) -> Result<User, UserError> {
        let email = Email::parse(email)?;
        let name = Name::parse(name)?;
        let firebase_id = FirebaseId::parse(firebase_id)?;

        let mut uow = UnitOfWork::begin(&self.db, &self.dispatcher).await?;
        if !self.users.is_email_unique(uow.session(), &email).await? {
            uow.rollback().await?;
            return Err(UserError::EmailNotUnique(email.to_string()));
        }

        let mut user = User::create(email, name, firebase_id, self.dispatcher.clock().now());
        self.commit(uow, &mut user).await?;

        info!(user_id = %user.id(), "user created");
        Ok(user)
    }

    #[instrument(skip(self, name))]
    pub async fn rename_user(&self, id: Uuid, name: &str) -> Result<User, UserError> {
        let name = Name::parse(name)?;

        let mut uow = UnitOfWork::begin(&self.db, &self.dispatcher).await?;
        let Some(mut user) = self.users.get_by_id(uow.session(), id).await? else {
            uow.rollback().await?;
            return Err(UserError::NotFound(id));
        };

        user.rename(name);
        user.mark_modified(self.dispatcher.clock().now());
        self.commit(uow, &mut user).await?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User, UserError> {
        let mut session = self.db.begin().await?;
        let user = self.users.get_by_id(&mut session, id).await;
        session.rollback().await?;
        user?.ok_or(UserError::NotFound(id))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let email = Email::parse(email)?;
        let mut session = self.db.begin().await?;
        let user = self.users.get_by_email(&mut session, &email).await;
        session.rollback().await?;
        Ok(user?)
    }

    /// Stage `user` and commit it with its events. A failure while staging
    /// is reported the same way as one found at commit.
    async fn commit(&self, mut uow: UnitOfWork<'_, D::Session>, user: &mut User) -> Result<(), UserError> {
        let email = user.email().to_string();

        if let Err(err) = self.users.save(uow.session(), user).await {
            if let Err(rollback_err) = uow.rollback().await {
                warn!(error = %rollback_err, "rollback after failed user write failed");
            }
            return Err(save_failed(SaveError::from(err), email));
        }

        match uow.save_changes(user).await {
            Ok(_) => Ok(()),
            Err(err) => Err(save_failed(err, email)),
        }
    }
}

fn save_failed(err: SaveError, email: String) -> UserError {
    match err {
        SaveError::Persistence(inner) if inner.violates(EMAIL_UNIQUE_CONSTRAINT) => UserError::EmailNotUnique(email),
        other => UserError::Save(other),
    }
}
