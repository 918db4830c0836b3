//! Auth HTTP handlers: register, login, token refresh.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::handlers::http::AppState;
use crate::models::UserInfo;
use crate::services::accounts::check_present;
use crate::services::{AccessResponse, LoginResponse, RegisterRequest};

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    #[serde(default, alias = "email")]
    pub email_or_username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    /// Trimmed identifier and the password as given, or field-keyed errors.
    pub fn into_credentials(self) -> AppResult<(String, String)> {
        let identifier = self.email_or_username.map(|i| i.trim().to_string());
        let mut errors = FieldErrors::new();
        check_present("email_or_username", identifier.as_deref(), true, &mut errors);
        check_present("password", self.password.as_deref(), true, &mut errors);
        match (identifier, self.password) {
            (Some(identifier), Some(password)) if errors.is_empty() => Ok((identifier, password)),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<UserInfo>), AppError> {
    let user = state.accounts().register(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<LoginResponse>, AppError> {
    let (identifier, password) = body.into_credentials()?;
    let response = state.credentials().login(&identifier, &password).await?;
    Ok(Json(response))
}

/// POST /token/refresh
pub async fn refresh(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RefreshRequest>, AppError>,
) -> Result<Json<AccessResponse>, AppError> {
    let response = state.accounts().refresh(&body.refresh).await?;
    Ok(Json(response))
}
