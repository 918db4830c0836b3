//! PostgreSQL user store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::store::{ensure_unique, uniqueness_conflicts, UserStore, EMAIL_TAKEN, USERNAME_TAKEN};
use super::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserChanges};

/// `users` table backed store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Activate or deactivate an account.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<()> {
        let r = sqlx::query("UPDATE users SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if r.rows_affected() == 0 {
            return Err(AppError::Internal(anyhow::anyhow!("user {} not found", id)));
        }
        Ok(())
    }
}

/// Serializes writers so the cross-field uniqueness check and the write are atomic.
async fn lock_users(tx: &mut Transaction<'_, Postgres>) -> AppResult<()> {
    sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// `(email, username)` of users, other than `exclude`, holding any of `values` in either column.
async fn clashing_users(
    tx: &mut Transaction<'_, Postgres>,
    values: Vec<String>,
    exclude: Option<Uuid>,
) -> AppResult<Vec<(String, String)>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT email, username FROM users
        WHERE (email = ANY($1) OR username = ANY($1))
          AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(values)
    .bind(exclude)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Unique-constraint races surface as the same field errors as the pre-check.
fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_username_key") => AppError::field("username", USERNAME_TAKEN),
                _ => AppError::field("email", EMAIL_TAKEN),
            };
        }
    }
    AppError::Db(err)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        let mut rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, is_active, last_login, date_joined
            FROM users WHERE email = $1 OR username = $1
            LIMIT 2
            "#,
        )
        .bind(identifier)
        .fetch_all(&self.pool)
        .await?;
        if rows.len() > 1 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "identifier matches more than one user"
            )));
        }
        Ok(rows.pop())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, is_active, last_login, date_joined FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;
        lock_users(&mut tx).await?;

        let values = vec![new_user.email.clone(), new_user.username.clone()];
        let others = clashing_users(&mut tx, values, None).await?;
        ensure_unique(uniqueness_conflicts(
            others.iter().map(|(e, u)| (e.as_str(), u.as_str())),
            Some(new_user.email.as_str()),
            Some(new_user.username.as_str()),
        ))?;

        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, password_hash, is_active, date_joined)
            VALUES ($1, $2, $3, $4, TRUE, NOW())
            RETURNING id, email, username, password_hash, is_active, last_login, date_joined
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        if changes.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut tx = self.pool.begin().await?;
        lock_users(&mut tx).await?;

        let values: Vec<String> = [changes.email.clone(), changes.username.clone()]
            .into_iter()
            .flatten()
            .collect();
        if !values.is_empty() {
            let others = clashing_users(&mut tx, values, Some(id)).await?;
            ensure_unique(uniqueness_conflicts(
                others.iter().map(|(e, u)| (e.as_str(), u.as_str())),
                changes.email.as_deref(),
                changes.username.as_deref(),
            ))?;
        }

        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                username = COALESCE($3, username),
                password_hash = COALESCE($4, password_hash)
            WHERE id = $1
            RETURNING id, email, username, password_hash, is_active, last_login, date_joined
            "#,
        )
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.username)
        .bind(&changes.password_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;
        Ok(row)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
