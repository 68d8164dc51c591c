use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use std::net::SocketAddr;

use crate::{
    dtos::auth::{LoginRequest, RefreshTokenRequest, RegisterRequest},
    dtos::SuccessResponse,
    middleware::AuthUser,
    utils::{net, ValidatedJson},
    AppState,
};

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 409, description = "Email or username already taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

/// Login with email/username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or inactive account", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let ip_address = net::client_ip(&headers, peer);
    let user_agent = net::user_agent(&headers);

    let res = state.auth_service.login(req, ip_address, user_agent).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = RefreshTokenResponse),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.refresh(req).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Logout everywhere by revoking all refresh tokens
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out successfully", body = SuccessResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.logout(&user).await?;
    Ok((
        StatusCode::OK,
        Json(SuccessResponse::new("Logged out successfully")),
    ))
}
