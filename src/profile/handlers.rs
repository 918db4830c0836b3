//! Profile HTTP handlers.

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::middleware::CurrentUser;
use crate::models::UserInfo;
use crate::services::UpdateProfileRequest;

/// GET /profile
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserInfo> {
    Json(UserInfo::from(user))
}

/// PUT|PATCH /profile: any subset of `email`, `username`, `password`.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(body), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> Result<Json<UserInfo>, AppError> {
    let info = state.accounts().update_profile(&user, body).await?;
    Ok(Json(info))
}
