//! User model - account records with a tagged lifecycle state.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// User lifecycle state codes.
///
/// Soft deletion is a state, not a nullable-timestamp-as-boolean; the
/// `deleted_at` column only records when the transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    Active,
    Deactivated,
    SoftDeleted,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Active => "active",
            UserState::Deactivated => "deactivated",
            UserState::SoftDeleted => "deleted",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "active" => Some(UserState::Active),
            "deactivated" => Some(UserState::Deactivated),
            "deleted" => Some(UserState::SoftDeleted),
            _ => None,
        }
    }
}

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub state: String,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active, unverified user.
    pub fn new(email: String, username: String, hashed_password: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            hashed_password,
            state: UserState::Active.as_str().to_string(),
            is_verified: false,
            is_superuser: false,
            last_login_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn user_state(&self) -> Option<UserState> {
        UserState::parse(&self.state)
    }

    pub fn is_active(&self) -> bool {
        self.state == UserState::Active.as_str()
    }

    pub fn is_deleted(&self) -> bool {
        self.state == UserState::SoftDeleted.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_starts_active_and_unverified() {
        let user = User::new(
            "a@example.com".to_string(),
            "alice".to_string(),
            "$argon2id$...".to_string(),
        );

        assert_eq!(user.user_state(), Some(UserState::Active));
        assert!(user.is_active());
        assert!(!user.is_deleted());
        assert!(!user.is_verified);
        assert!(!user.is_superuser);
        assert!(user.last_login_at.is_none());
        assert!(user.deleted_at.is_none());
    }

    #[test]
    fn state_codes_round_trip() {
        for state in [
            UserState::Active,
            UserState::Deactivated,
            UserState::SoftDeleted,
        ] {
            assert_eq!(UserState::parse(state.as_str()), Some(state));
        }
        assert_eq!(UserState::parse("banned"), None);
    }

    #[test]
    fn soft_deleted_user_is_not_active() {
        let mut user = User::new(
            "a@example.com".to_string(),
            "alice".to_string(),
            "hash".to_string(),
        );
        user.state = UserState::SoftDeleted.as_str().to_string();
        user.deleted_at = Some(Utc::now());

        assert!(!user.is_active());
        assert!(user.is_deleted());
    }
}
