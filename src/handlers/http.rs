//! Application state and health probe.

use std::sync::Arc;

use axum::{http::StatusCode, Json};
use serde_json::json;

use crate::auth::{Argon2Hasher, JwtSecret, PasswordHasher};
use crate::db::UserStore;
use crate::services::{AccountService, CredentialResolver};

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub jwt_secret: JwtSecret,
    pub credentials: CredentialResolver,
    pub accounts: AccountService,
}

impl AppState {
    /// Wire the services around a user store, with Argon2 hashing and `jwt_secret` as token issuer.
    pub fn new(users: Arc<dyn UserStore>, jwt_secret: JwtSecret, update_last_login: bool) -> Self {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher);
        let credentials = CredentialResolver::new(
            users.clone(),
            hasher.clone(),
            Arc::new(jwt_secret.clone()),
            update_last_login,
        );
        let accounts = AccountService::new(users.clone(), hasher, jwt_secret.clone());
        Self {
            users,
            jwt_secret,
            credentials,
            accounts,
        }
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }
    pub fn jwt_secret(&self) -> &JwtSecret {
        &self.jwt_secret
    }
    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }
    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }
}

/// GET /health — liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "amankan" })),
    )
}
