use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::{Validate, ValidationError};

/// JSON extractor that runs `validator` rules before the handler sees the
/// payload. Malformed bodies and failed rules both surface as the stable
/// VALIDATION_ERROR code.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation("VALIDATION_ERROR", format!("Invalid request body: {}", e)))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Password complexity: at least 8 characters with one uppercase letter,
/// one lowercase letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    if password.len() < 8 {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(errors.join("; ").into());
        Err(err)
    }
}

/// Username: 3-50 characters from `[A-Za-z0-9_-]`.
pub fn validate_username_format(username: &str) -> Result<(), ValidationError> {
    fn username_error(message: &'static str) -> ValidationError {
        let mut err = ValidationError::new("username_format");
        err.message = Some(message.into());
        err
    }

    if username.len() < 3 {
        return Err(username_error("Username must be at least 3 characters long"));
    }
    if username.len() > 50 {
        return Err(username_error("Username must be at most 50 characters long"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(username_error(
            "Username can only contain letters, numbers, underscores, and hyphens",
        ));
    }

    Ok(())
}
