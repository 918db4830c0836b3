//! Application error types and their HTTP representation.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Field name -> list of messages, serialized as-is in 400 responses.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Why an authentication attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No user matches the identifier (or the token's subject no longer exists).
    UserNotFound,
    /// The identifier resolved but the password check failed.
    InvalidPassword,
    /// Credentials are valid but the account is deactivated.
    UserInactive,
}

impl AuthFailure {
    /// Machine-readable code returned alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::UserNotFound => "user_not_found",
            AuthFailure::InvalidPassword => "invalid_password",
            AuthFailure::UserInactive => "user_inactive",
        }
    }

    /// Human-readable message shown to the client.
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::UserNotFound => "An account with this email/username was not found.",
            AuthFailure::InvalidPassword => "Wrong Password. Please Try Again",
            AuthFailure::UserInactive => {
                "Your account has been deactivated. Please contact the administrator."
            }
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Validation error: {0:?}")]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication failed: {0}")]
    Auth(AuthFailure),

    #[error("Authentication credentials were not provided")]
    NotAuthenticated,

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Single-field validation error.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }
}

/// Flatten `validator` errors into [`FieldErrors`], using each error's message when set.
pub fn field_errors(errors: &validator::ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", e.code))
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }
    fields
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(field_errors(&errors))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(fields) => {
                (StatusCode::BAD_REQUEST, Json(json!(fields))).into_response()
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": msg }))).into_response()
            }
            AppError::Auth(failure) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": failure.message(), "code": failure.code() })),
            )
                .into_response(),
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "detail": "Authentication credentials were not provided.",
                    "code": "not_authenticated"
                })),
            )
                .into_response(),
            AppError::Jwt(msg) => {
                tracing::debug!(error = %msg, "rejected token");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "detail": "Token is invalid or expired",
                        "code": "token_not_valid"
                    })),
                )
                    .into_response()
            }
            AppError::Db(e) => {
                tracing::error!(error = %e, "database error");
                internal_error()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "A server error occurred." })),
    )
        .into_response()
}

pub type AppResult<T> = Result<T, AppError>;
