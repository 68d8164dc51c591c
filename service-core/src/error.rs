use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Application-level error taxonomy.
///
/// Every variant maps to a status code and a stable machine-readable `code`
/// in the response body; the HTTP layer never invents its own statuses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, code: &'static str },

    #[error("{message}")]
    BadRequest { message: String, code: &'static str },

    #[error("{message}")]
    Authentication { message: String, code: &'static str },

    #[error("{message}")]
    Authorization { message: String, code: &'static str },

    #[error("{message}")]
    Conflict { message: String, code: &'static str },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after: Option<DateTime<Utc>>,
    },

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code,
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code,
        }
    }

    pub fn authentication(code: &'static str, message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code,
        }
    }

    pub fn authorization(code: &'static str, message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            code,
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            code,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<DateTime<Utc>>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    /// Stable error code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { code, .. }
            | AppError::BadRequest { code, .. }
            | AppError::Authentication { code, .. }
            | AppError::Authorization { code, .. }
            | AppError::Conflict { code, .. } => code,
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::Database(_) | AppError::Internal(_) | AppError::Config(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            AppError::Authorization { .. } => StatusCode::FORBIDDEN,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Internal(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::validation("VALIDATION_ERROR", err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(anyhow::Error::new(err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::authentication("INVALID_TOKEN", err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let (message, details, retry_after_secs) = match &self {
            AppError::RateLimited {
                message,
                retry_after,
            } => {
                let details = retry_after.map(|at| {
                    serde_json::json!({ "retry_after": at.to_rfc3339() })
                });
                let secs = retry_after
                    .map(|at| (at - Utc::now()).num_seconds().max(0) as u64);
                (message.clone(), details, secs)
            }
            AppError::Database(err) | AppError::Internal(err) | AppError::Config(err) => {
                // Never leak internals; the full chain goes to the log instead.
                tracing::error!(error = ?err, "request failed with internal error");
                ("Internal server error".to_string(), None, None)
            }
            other => (other.to_string(), None, None),
        };

        let mut res = (
            status,
            Json(ErrorBody {
                error: message,
                code,
                details,
            }),
        )
            .into_response();

        if let Some(secs) = retry_after_secs {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, secs.into());
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use chrono::Duration;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn authentication_error_maps_to_401_with_code() {
        let err = AppError::authentication("INVALID_CREDENTIALS", "Invalid email or password");
        let res = err.into_response();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(res).await;
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn rate_limited_carries_retry_after_header_and_details() {
        let at = Utc::now() + Duration::minutes(10);
        let err = AppError::rate_limited("Too many login attempts", Some(at));
        let res = err.into_response();

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        let header = res
            .headers()
            .get(axum::http::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap();
        assert!(header > 0 && header <= 600);

        let body = body_json(res).await;
        assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
        assert!(body["details"]["retry_after"].is_string());
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let err = AppError::Database(anyhow::anyhow!("connection refused on 10.0.0.3:5432"));
        let res = err.into_response();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn conflict_keeps_its_stable_code() {
        let err = AppError::conflict("EMAIL_EXISTS", "Email already registered");
        let res = err.into_response();

        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body = body_json(res).await;
        assert_eq!(body["code"], "EMAIL_EXISTS");
    }
}
