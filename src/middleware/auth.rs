//! Bearer-token authentication: resolves the current user for profile handlers.

use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

use crate::auth::TokenType;
use crate::error::{AppError, AuthFailure};
use crate::handlers::http::AppState;
use crate::models::User;

/// Extractor: the active user named by a valid access token.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::NotAuthenticated)?;

        let user_id = state.jwt_secret().validate(bearer.token(), TokenType::Access)?;
        let user = state
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::Auth(AuthFailure::UserNotFound))?;
        if !user.is_active {
            debug!(user_id = %user.id, "rejected token of inactive user");
            return Err(AppError::Auth(AuthFailure::UserInactive));
        }
        Ok(CurrentUser(user))
    }
}
