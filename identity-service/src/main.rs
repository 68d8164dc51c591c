use identity_service::{
    build_router,
    config::IdentityConfig,
    services::{AuthService, Database, JwtService, LoginRateLimiter, UserCache},
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = IdentityConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    let pool = identity_service::db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::Database(anyhow::anyhow!(e)))?;
    identity_service::db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::Database(anyhow::anyhow!(e)))?;
    let db = Database::new(pool);

    let jwt = JwtService::new(&config.jwt);
    let cache = Arc::new(UserCache::new(config.cache.user_ttl_seconds));
    let rate_limiter = LoginRateLimiter::new(&config.rate_limit);
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );

    let auth_service = AuthService::new(
        db.clone(),
        jwt.clone(),
        rate_limiter,
        cache.clone(),
        config.jwt.refresh_token_expiry_days,
    );

    let state = AppState {
        config: config.clone(),
        db,
        jwt,
        cache,
        auth_service,
        ip_rate_limiter,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
