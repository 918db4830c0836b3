//! In-process user store (tests, `DATABASE_URL=memory`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{ensure_unique, uniqueness_conflicts, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserChanges};

/// `HashMap`-backed store; all checks and writes happen under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate or deactivate an account.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("user {} not found", id)))?;
        user.is_active = is_active;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        let mut matches = users
            .values()
            .filter(|u| u.email == identifier || u.username == identifier);
        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "identifier matches more than one user"
            )));
        }
        Ok(first)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        ensure_unique(uniqueness_conflicts(
            users
                .values()
                .map(|u| (u.email.as_str(), u.username.as_str())),
            Some(new_user.email.as_str()),
            Some(new_user.username.as_str()),
        ))?;

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            username: new_user.username,
            password_hash: new_user.password_hash,
            is_active: true,
            last_login: None,
            date_joined: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            return Ok(None);
        }
        ensure_unique(uniqueness_conflicts(
            users
                .values()
                .filter(|u| u.id != id)
                .map(|u| (u.email.as_str(), u.username.as_str())),
            changes.email.as_deref(),
            changes.username.as_deref(),
        ))?;

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }
}
