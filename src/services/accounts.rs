//! Account registration, profile update and access-token refresh.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::auth::{JwtSecret, PasswordHasher, TokenType};
use crate::db::UserStore;
use crate::error::{field_errors, AppError, AppResult, AuthFailure, FieldErrors};
use crate::models::{NewUser, User, UserChanges, UserInfo};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Any subset of the public fields plus an optional new password.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessResponse {
    pub access: String,
}

/// Registration and self-service profile changes.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    jwt: JwtSecret,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>, jwt: JwtSecret) -> Self {
        Self { users, hasher, jwt }
    }

    #[instrument(skip(self, request), fields(username = ?request.username))]
    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserInfo> {
        let request = RegisterRequest {
            email: request.email.map(|e| normalize_email(e.trim())),
            username: request.username.map(|u| u.trim().to_string()),
            password: request.password,
        };
        let mut errors = request
            .validate()
            .err()
            .map(|e| field_errors(&e))
            .unwrap_or_default();
        check_present("email", request.email.as_deref(), true, &mut errors);
        check_present("username", request.username.as_deref(), true, &mut errors);
        check_present("password", request.password.as_deref(), true, &mut errors);
        check_username(request.username.as_deref(), &mut errors);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let (Some(email), Some(username), Some(password)) =
            (request.email, request.username, request.password)
        else {
            return Err(AppError::field("password", REQUIRED));
        };

        let password_hash = self.hasher.hash(&password)?;
        let user = self
            .users
            .create(NewUser {
                email,
                username,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(UserInfo::from(user))
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.id))]
    pub async fn update_profile(
        &self,
        user: &User,
        request: UpdateProfileRequest,
    ) -> AppResult<UserInfo> {
        let request = UpdateProfileRequest {
            email: request.email.map(|e| normalize_email(e.trim())),
            username: request.username.map(|u| u.trim().to_string()),
            password: request.password,
        };
        let mut errors = request
            .validate()
            .err()
            .map(|e| field_errors(&e))
            .unwrap_or_default();
        check_present("email", request.email.as_deref(), false, &mut errors);
        check_present("username", request.username.as_deref(), false, &mut errors);
        check_present("password", request.password.as_deref(), false, &mut errors);
        check_username(request.username.as_deref(), &mut errors);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(self.hasher.hash(password)?),
            None => None,
        };
        let password_changed = password_hash.is_some();
        let changes = UserChanges {
            email: request.email,
            username: request.username,
            password_hash,
        };

        let updated = self
            .users
            .update(user.id, changes)
            .await?
            .ok_or(AppError::Auth(AuthFailure::UserNotFound))?;

        info!(password_changed, "profile updated");
        Ok(UserInfo::from(updated))
    }

    /// Mint a new access token from a refresh token whose user still exists and is active.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AccessResponse> {
        let user_id = self.jwt.validate(refresh_token, TokenType::Refresh)?;
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::Auth(AuthFailure::UserNotFound))?;
        if !user.is_active {
            return Err(AppError::Auth(AuthFailure::UserInactive));
        }
        Ok(AccessResponse {
            access: self.jwt.issue_access(user.id)?,
        })
    }
}

/// Lowercase the domain part; the local part is kept as given.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Letters, digits and `@ . + - _`.
pub fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Missing (when `required`) or blank values replace any other message for the field.
pub(crate) fn check_present(
    field: &str,
    value: Option<&str>,
    required: bool,
    errors: &mut FieldErrors,
) {
    let message = match value {
        None if required => REQUIRED,
        Some(v) if v.trim().is_empty() => BLANK,
        _ => return,
    };
    errors.insert(field.to_string(), vec![message.to_string()]);
}

fn check_username(username: Option<&str>, errors: &mut FieldErrors) {
    if let Some(username) = username {
        if !username.is_empty() && !is_valid_username(username) {
            errors
                .entry("username".to_string())
                .or_default()
                .push(INVALID_USERNAME.to_string());
        }
    }
}
