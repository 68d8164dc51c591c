//! Refresh token ledger records.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// One issued refresh credential. Only the SHA-256 hash of the raw token is
/// stored; the raw value exists solely in the client's hands.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Create a new ledger record for a raw token.
    pub fn new(user_id: Uuid, raw_token: &str, expires_in_days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: Self::hash_token(raw_token),
            expires_at: now + Duration::days(expires_in_days),
            revoked_at: None,
            created_at: now,
        }
    }

    /// Hash a raw token with SHA-256, hex-encoded.
    pub fn hash_token(raw_token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Compare a raw token against the stored hash.
    pub fn matches(&self, raw_token: &str) -> bool {
        self.token_hash == Self::hash_token(raw_token)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Usable iff not revoked and not expired.
    pub fn is_valid(&self) -> bool {
        !self.is_revoked() && !self.is_expired()
    }
}
