use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{models::User, services::jwt::TokenType, AppState};

/// Middleware requiring a valid bearer access token.
///
/// Decodes the token, resolves the user (cache first, store second) and
/// stores the full record in request extensions. Soft-deleted users resolve
/// to the same error as unknown ones.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(AppError::authentication(
            "INVALID_TOKEN",
            "Missing or invalid Authorization header",
        ));
    };

    let claims = state.jwt.decode(token).map_err(|_| {
        AppError::authentication("INVALID_TOKEN", "Invalid authentication credentials")
    })?;

    if claims.token_type != TokenType::Access {
        return Err(AppError::authentication(
            "INVALID_TOKEN_TYPE",
            "Invalid token type",
        ));
    }

    let user_id = claims.subject().map_err(|_| {
        AppError::authentication("INVALID_TOKEN", "Invalid authentication credentials")
    })?;

    let user = match state.cache.get(user_id) {
        Some(user) => user,
        None => {
            let Some(user) = state.db.find_user_by_id(user_id).await? else {
                return Err(AppError::authentication("USER_NOT_FOUND", "User not found"));
            };
            state.cache.insert(user.clone());
            user
        }
    };

    if user.is_deleted() {
        return Err(AppError::authentication("USER_NOT_FOUND", "User not found"));
    }

    if !user.is_active() {
        return Err(AppError::authentication("USER_INACTIVE", "User is inactive"));
    }

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Extractor for the authenticated user resolved by `auth_middleware`.
pub struct AuthUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<User>().cloned().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "authenticated user missing from request extensions"
            ))
        })?;

        Ok(AuthUser(user))
    }
}

/// Extractor that additionally requires a verified email address.
pub struct VerifiedUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for VerifiedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_verified {
            return Err(AppError::authorization(
                "EMAIL_NOT_VERIFIED",
                "Email not verified",
            ));
        }

        Ok(VerifiedUser(user))
    }
}
