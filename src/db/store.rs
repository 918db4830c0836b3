//! The user store capability used by the services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{NewUser, User, UserChanges};

pub(crate) const EMAIL_TAKEN: &str = "A user with that email already exists.";
pub(crate) const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Persistence for user accounts.
///
/// Implementations keep `email` and `username` unique, and also unique across each
/// other: no user's email may equal another user's username. That makes
/// [`UserStore::find_by_identifier`] resolve to at most one user.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// User whose email or username equals `identifier`.
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<User>>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Insert a new, active user. Duplicates fail with field-keyed validation errors.
    async fn create(&self, new_user: NewUser) -> AppResult<User>;

    /// Apply `changes` to user `id`. Returns `None` if the user does not exist.
    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>>;

    /// Set the user's `last_login`.
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}

/// Field errors for `email`/`username` values clashing with other users' `(email, username)`.
pub(crate) fn uniqueness_conflicts<'a, I>(
    others: I,
    email: Option<&str>,
    username: Option<&str>,
) -> FieldErrors
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut email_taken = false;
    let mut username_taken = false;
    for (other_email, other_username) in others {
        if let Some(email) = email {
            email_taken |= other_email == email || other_username == email;
        }
        if let Some(username) = username {
            username_taken |= other_username == username || other_email == username;
        }
    }

    let mut errors = FieldErrors::new();
    if email_taken {
        errors.insert("email".to_string(), vec![EMAIL_TAKEN.to_string()]);
    }
    if username_taken {
        errors.insert("username".to_string(), vec![USERNAME_TAKEN.to_string()]);
    }
    errors
}

/// `Ok(())` when there are no conflicts, otherwise the validation error.
pub(crate) fn ensure_unique(errors: FieldErrors) -> AppResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}
