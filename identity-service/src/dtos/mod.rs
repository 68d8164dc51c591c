pub mod auth;
pub mod user;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body shape shared by every failure response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Invalid email or password")]
    pub error: String,
    #[schema(example = "INVALID_CREDENTIALS")]
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    #[schema(example = "Logged out successfully")]
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
