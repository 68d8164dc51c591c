//! PostgreSQL database service.
//!
//! All reads used by the session core exclude soft-deleted users; uniqueness
//! checks at registration do not, since a soft-deleted account still owns its
//! email and username.

use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{LoginAttempt, RefreshToken, User, UserState};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::Database(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Find a non-deleted user by ID.
    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND state <> 'deleted'")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))
    }

    /// Find a non-deleted user by login identifier (email or username).
    pub async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE (LOWER(email) = LOWER($1) OR username = $1) AND state <> 'deleted'
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))
    }

    /// Whether any account (including soft-deleted ones) holds this email.
    pub async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))
    }

    /// Whether any account (including soft-deleted ones) holds this username.
    pub async fn username_taken(
        &self,
        username: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))
    }

    /// Insert a new user.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, hashed_password, state, is_verified,
                               is_superuser, last_login_at, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(&user.state)
        .bind(user.is_verified)
        .bind(user.is_superuser)
        .bind(user.last_login_at)
        .bind(user.deleted_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Update profile fields (email, username, verified flag).
    pub async fn update_user_profile(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $1, username = $2, is_verified = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(user.is_verified)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Replace a user's password hash.
    pub async fn update_user_password(
        &self,
        user_id: Uuid,
        hashed_password: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET hashed_password = $1, updated_at = NOW() WHERE id = $2")
            .bind(hashed_password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Commit a successful login: the audit row, the last-login timestamp and
    /// the new refresh-token record land atomically, so an aborted request
    /// leaves no partial session state behind.
    pub async fn record_login_success(
        &self,
        attempt: &LoginAttempt,
        refresh_token: &RefreshToken,
    ) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;

        insert_login_attempt_query(attempt)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;

        sqlx::query("UPDATE users SET last_login_at = $1, updated_at = NOW() WHERE id = $2")
            .bind(attempt.attempted_at)
            .bind(refresh_token.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;

        insert_refresh_token_query(refresh_token)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Soft-delete a user and revoke every live refresh token, atomically.
    /// Returns the number of tokens revoked.
    pub async fn soft_delete_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;

        sqlx::query(
            "UPDATE users SET state = $1, deleted_at = NOW(), updated_at = NOW() WHERE id = $2",
        )
        .bind(UserState::SoftDeleted.as_str())
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?
        .rows_affected();

        tx.commit()
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(revoked)
    }

    // ==================== Refresh Token Operations ====================

    /// Insert a new refresh token record.
    pub async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        insert_refresh_token_query(token)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// All non-revoked refresh tokens for a user, newest first.
    pub async fn find_active_refresh_tokens(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RefreshToken>, AppError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT * FROM refresh_tokens
            WHERE user_id = $1 AND revoked_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))
    }

    /// Revoke one refresh token. A no-op on already-revoked records.
    pub async fn revoke_refresh_token(&self, token_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(token_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Revoke all live refresh tokens for a user. Returns the revoked count.
    pub async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected())
    }

    // ==================== Login Attempt Operations ====================

    /// Append one login attempt row.
    pub async fn insert_login_attempt(&self, attempt: &LoginAttempt) -> Result<(), AppError> {
        insert_login_attempt_query(attempt)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Count failed attempts for an (email, ip) pair since `window_start`.
    pub async fn count_recent_failed_attempts(
        &self,
        email: &str,
        ip_address: &str,
        window_start: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE email = $1 AND ip_address = $2
              AND success = FALSE AND attempted_at >= $3
            "#,
        )
        .bind(email)
        .bind(ip_address)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))
    }

    /// Timestamp of the oldest in-window failed attempt for an (email, ip)
    /// pair, used to compute when the window frees up again.
    pub async fn oldest_failed_attempt_since(
        &self,
        email: &str,
        ip_address: &str,
        window_start: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT attempted_at FROM login_attempts
            WHERE email = $1 AND ip_address = $2
              AND success = FALSE AND attempted_at >= $3
            ORDER BY attempted_at ASC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(ip_address)
        .bind(window_start)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))
    }
}

fn insert_refresh_token_query(
    token: &RefreshToken,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, revoked_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(token.id)
    .bind(token.user_id)
    .bind(&token.token_hash)
    .bind(token.expires_at)
    .bind(token.revoked_at)
    .bind(token.created_at)
}

fn insert_login_attempt_query(
    attempt: &LoginAttempt,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        r#"
        INSERT INTO login_attempts (id, email, user_id, ip_address, user_agent, success, attempted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(attempt.id)
    .bind(&attempt.email)
    .bind(attempt.user_id)
    .bind(&attempt.ip_address)
    .bind(&attempt.user_agent)
    .bind(attempt.success)
    .bind(attempt.attempted_at)
}
