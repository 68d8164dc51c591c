use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::user::{ChangePasswordRequest, UpdateUserRequest, UserResponse},
    dtos::SuccessResponse,
    middleware::{AuthUser, VerifiedUser},
    utils::ValidatedJson,
    AppState,
};

/// Get the current user profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_me(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(UserResponse::from(user))
}

/// Update the current user profile
#[utoipa::path(
    put,
    path = "/users/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user profile", body = UserResponse),
        (status = 409, description = "Email or username already taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.update_profile(user, req).await?;
    Ok(Json(res))
}

/// Change the current user's password
#[utoipa::path(
    post,
    path = "/users/me/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed successfully", body = SuccessResponse),
        (status = 400, description = "New password equals the current one", body = ErrorResponse),
        (status = 401, description = "Current password is incorrect", body = ErrorResponse),
        (status = 403, description = "Email not verified", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.change_password(&user, req).await?;
    Ok((
        StatusCode::OK,
        Json(SuccessResponse::new("Password changed successfully")),
    ))
}

/// Soft-delete the current user account
#[utoipa::path(
    delete,
    path = "/users/me",
    responses(
        (status = 200, description = "Account deleted", body = SuccessResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
        (status = 403, description = "Email not verified", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn delete_me(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.delete_account(&user).await?;
    Ok((
        StatusCode::OK,
        Json(SuccessResponse::new("User account deleted successfully")),
    ))
}
