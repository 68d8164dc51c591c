pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::IdentityConfig;
use crate::services::{AuthService, Database, JwtService, UserCache};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::user::get_me,
        handlers::user::update_me,
        handlers::user::change_password,
        handlers::user::delete_me,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::SuccessResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::RegisterResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::RefreshTokenRequest,
            dtos::auth::RefreshTokenResponse,
            dtos::user::UserResponse,
            dtos::user::UpdateUserRequest,
            dtos::user::ChangePasswordRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "User authentication and token management"),
        (name = "Users", description = "User profile management"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub cache: Arc<UserCache>,
    pub auth_service: AuthService,
    pub ip_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        config::Environment::Dev => true,
        config::Environment::Prod => state.config.swagger.enabled == config::SwaggerMode::Public,
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // Keep the OpenAPI JSON available for programmatic access.
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .merge(
            Router::new()
                .route("/auth/logout", post(handlers::auth::logout))
                .route(
                    "/users/me",
                    get(handlers::user::get_me)
                        .put(handlers::user::update_me)
                        .delete(handlers::user::delete_me),
                )
                .route(
                    "/users/me/change-password",
                    post(handlers::user::change_password),
                )
                .layer(from_fn_with_state(
                    state.clone(),
                    middleware::auth_middleware,
                )),
        )
        .with_state(state.clone())
        // Global per-IP guard-rail, distinct from the login-attempt limiter.
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        );

    app
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "database health check failed");
        e
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "postgres": "up"
        }
    })))
}
