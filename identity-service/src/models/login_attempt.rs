//! Login attempt audit records.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// One login try, successful or not. Append-only: rows are never mutated or
/// deleted, and the rate limiter recomputes its window from them on each
/// check instead of keeping a separate counter.
#[derive(Debug, Clone, FromRow)]
pub struct LoginAttempt {
    pub id: Uuid,
    pub email: String,
    pub user_id: Option<Uuid>,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub success: bool,
    pub attempted_at: DateTime<Utc>,
}

impl LoginAttempt {
    pub fn success(
        email: String,
        user_id: Uuid,
        ip_address: String,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            user_id: Some(user_id),
            ip_address,
            user_agent,
            success: true,
            attempted_at: Utc::now(),
        }
    }

    pub fn failure(email: String, ip_address: String, user_agent: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            user_id: None,
            ip_address,
            user_agent,
            success: false,
            attempted_at: Utc::now(),
        }
    }
}
