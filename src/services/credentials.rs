//! Login credential resolution: identifier lookup, password and active checks, token pair.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::db::UserStore;
use crate::error::{AppError, AppResult, AuthFailure};
use crate::models::UserInfo;

/// Successful login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub refresh: String,
    pub access: String,
    pub user: UserInfo,
}

/// Resolves `(identifier, password)` into a token pair or a categorized [`AuthFailure`].
#[derive(Clone)]
pub struct CredentialResolver {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<dyn TokenIssuer>,
    update_last_login: bool,
}

impl CredentialResolver {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        issuer: Arc<dyn TokenIssuer>,
        update_last_login: bool,
    ) -> Self {
        Self {
            users,
            hasher,
            issuer,
            update_last_login,
        }
    }

    /// `identifier` may be an email or a username.
    #[instrument(skip(self, password))]
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<LoginResponse> {
        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| {
                debug!("no user for identifier");
                AppError::Auth(AuthFailure::UserNotFound)
            })?;

        if !self.hasher.verify(password, &user.password_hash)? {
            debug!(user_id = %user.id, "password mismatch");
            return Err(AppError::Auth(AuthFailure::InvalidPassword));
        }

        if !user.is_active {
            debug!(user_id = %user.id, "inactive account");
            return Err(AppError::Auth(AuthFailure::UserInactive));
        }

        let tokens = self.issuer.issue(&user)?;

        if self.update_last_login {
            if let Err(e) = self.users.record_login(user.id, Utc::now()).await {
                warn!(user_id = %user.id, error = %e, "failed to record last login");
            }
        }

        info!(user_id = %user.id, "login succeeded");
        Ok(LoginResponse {
            refresh: tokens.refresh,
            access: tokens.access,
            user: UserInfo::from(user),
        })
    }
}
