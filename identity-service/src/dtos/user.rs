use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::User;
use crate::utils::validation::validate_username_format;

/// User shape exposed over the API - never carries the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "alice")]
    pub username: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        let is_active = u.is_active();
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            is_active,
            is_verified: u.is_verified,
            is_superuser: u.is_superuser,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Partial profile update.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "new@example.com")]
    pub email: Option<String>,

    #[validate(custom(function = validate_username_format))]
    #[schema(example = "alice2")]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[schema(example = "OldPassw0rd")]
    pub current_password: String,

    #[validate(custom(function = crate::utils::validation::validate_password_strength))]
    #[schema(example = "NewPassw0rd", min_length = 8)]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_reflects_state() {
        let user = User::new(
            "a@example.com".to_string(),
            "alice".to_string(),
            "secret-hash".to_string(),
        );
        let res = UserResponse::from(user);

        assert!(res.is_active);
        assert!(!res.is_verified);
        // Serialized form must not contain the hash.
        let json = serde_json::to_value(&res).unwrap();
        assert!(json.get("hashed_password").is_none());
    }

    #[test]
    fn update_request_validates_present_fields_only() {
        let req = UpdateUserRequest {
            email: None,
            username: None,
        };
        assert!(req.validate().is_ok());

        let req = UpdateUserRequest {
            email: Some("not-an-email".to_string()),
            username: None,
        };
        assert!(req.validate().is_err());

        let req = UpdateUserRequest {
            email: None,
            username: Some("x!".to_string()),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn change_password_requires_strong_new_password() {
        let req = ChangePasswordRequest {
            current_password: "whatever".to_string(),
            new_password: "weak".to_string(),
        };
        assert!(req.validate().is_err());

        let req = ChangePasswordRequest {
            current_password: "whatever".to_string(),
            new_password: "Str0ngEnough".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
