use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dtos::user::UserResponse;
use crate::utils::validation::{validate_password_strength, validate_username_format};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(custom(function = validate_username_format))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(custom(function = validate_password_strength))]
    #[schema(example = "Passw0rd!", min_length = 8)]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "User registered successfully")]
    pub message: String,
    pub user: UserResponse,
}

/// Login accepts the registered email address or the username.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email or username is required"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "Passw0rd!")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    #[schema(example = 900)]
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    #[schema(example = 900)]
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(register("a@x.com", "alice", "Aa12345!").validate().is_ok());
    }

    #[test]
    fn registration_rejects_bad_fields() {
        assert!(register("nope", "alice", "Aa12345!").validate().is_err());
        assert!(register("a@x.com", "a", "Aa12345!").validate().is_err());
        assert!(register("a@x.com", "alice", "weak").validate().is_err());
    }

    #[test]
    fn login_requires_non_empty_fields() {
        let req = LoginRequest {
            email: String::new(),
            password: "p".to_string(),
        };
        assert!(req.validate().is_err());

        // Username identifiers are accepted, not just email shapes.
        let req = LoginRequest {
            email: "alice".to_string(),
            password: "p".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
