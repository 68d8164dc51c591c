//! Session orchestration: registration, login, refresh, logout, password
//! change, profile update and account deletion.
//!
//! Credential verification and hashing run on the blocking pool; argon2 is
//! deliberately expensive and must not stall the async workers.

use std::sync::Arc;

use service_core::error::AppError;

use crate::{
    dtos::auth::{
        LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse, RegisterRequest,
        RegisterResponse,
    },
    dtos::user::{ChangePasswordRequest, UpdateUserRequest, UserResponse},
    models::{LoginAttempt, RefreshToken, User},
    services::{Database, JwtService, LoginRateLimiter, UserCache},
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: JwtService,
    rate_limiter: LoginRateLimiter,
    cache: Arc<UserCache>,
    refresh_token_expiry_days: i64,
}

impl AuthService {
    pub fn new(
        db: Database,
        jwt: JwtService,
        rate_limiter: LoginRateLimiter,
        cache: Arc<UserCache>,
        refresh_token_expiry_days: i64,
    ) -> Self {
        Self {
            db,
            jwt,
            rate_limiter,
            cache,
            refresh_token_expiry_days,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, AppError> {
        if self.db.email_taken(&req.email, None).await? {
            return Err(AppError::conflict("EMAIL_EXISTS", "Email already registered"));
        }

        if self.db.username_taken(&req.username, None).await? {
            return Err(AppError::conflict("USERNAME_EXISTS", "Username already taken"));
        }

        let password_hash = hash_password_blocking(Password::new(req.password)).await?;

        let user = User::new(req.email, req.username, password_hash.into_string());
        self.db.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");

        Ok(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: UserResponse::from(user),
        })
    }

    pub async fn login(
        &self,
        req: LoginRequest,
        ip_address: String,
        user_agent: Option<String>,
    ) -> Result<LoginResponse, AppError> {
        let decision = self
            .rate_limiter
            .check(&self.db, &req.email, &ip_address)
            .await?;

        if !decision.allowed {
            self.rate_limiter
                .record(
                    &self.db,
                    &LoginAttempt::failure(req.email.clone(), ip_address.clone(), user_agent),
                )
                .await?;
            tracing::warn!(identifier = %req.email, ip = %ip_address, "login rate limit exceeded");
            return Err(AppError::rate_limited(
                "Too many login attempts. Please try again later.",
                decision.retry_after,
            ));
        }

        let user = self.db.find_user_by_identifier(&req.email).await?;

        let password_ok = match &user {
            Some(user) => {
                verify_password_blocking(
                    Password::new(req.password.clone()),
                    PasswordHashString::new(user.hashed_password.clone()),
                )
                .await?
            }
            None => false,
        };

        // Unknown identifier and wrong password are indistinguishable to the
        // caller, closing the account-enumeration channel.
        let Some(mut user) = user.filter(|_| password_ok) else {
            self.rate_limiter
                .record(
                    &self.db,
                    &LoginAttempt::failure(req.email.clone(), ip_address.clone(), user_agent),
                )
                .await?;
            return Err(AppError::authentication(
                "INVALID_CREDENTIALS",
                "Invalid email or password",
            ));
        };

        if !user.is_active() {
            return Err(AppError::authentication(
                "USER_INACTIVE",
                "User account is inactive",
            ));
        }

        let access_token = self
            .jwt
            .generate_access_token(user.id)
            .map_err(AppError::Internal)?;
        let refresh_token = self
            .jwt
            .generate_refresh_token(user.id)
            .map_err(AppError::Internal)?;

        let token_record =
            RefreshToken::new(user.id, &refresh_token, self.refresh_token_expiry_days);
        let attempt = LoginAttempt::success(
            req.email.clone(),
            user.id,
            ip_address.clone(),
            user_agent,
        );
        let logged_in_at = attempt.attempted_at;

        self.db.record_login_success(&attempt, &token_record).await?;
        self.cache.invalidate(user.id);
        user.last_login_at = Some(logged_in_at);

        tracing::info!(user_id = %user.id, ip = %ip_address, "user logged in");

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
            user: UserResponse::from(user),
        })
    }

    pub async fn refresh(&self, req: RefreshTokenRequest) -> Result<RefreshTokenResponse, AppError> {
        let claims = self
            .jwt
            .validate_refresh_token(&req.refresh_token)
            .map_err(|_| invalid_refresh_token())?;
        let user_id = claims.subject().map_err(|_| invalid_refresh_token())?;

        // Linear scan with a hash compare over the user's live tokens.
        // Session counts per user are small; an indexable token id would be
        // the upgrade path if that ever changes.
        let tokens = self.db.find_active_refresh_tokens(user_id).await?;
        let matched = tokens.iter().find(|t| t.matches(&req.refresh_token));

        // Expired, revoked and fabricated tokens fail identically.
        if !matched.map(|t| t.is_valid()).unwrap_or(false) {
            return Err(invalid_refresh_token());
        }

        let user = self.db.find_user_by_id(user_id).await?;
        let Some(user) = user.filter(User::is_active) else {
            return Err(AppError::authentication(
                "USER_NOT_FOUND",
                "User not found or inactive",
            ));
        };

        let access_token = self
            .jwt
            .generate_access_token(user.id)
            .map_err(AppError::Internal)?;

        tracing::info!(user_id = %user.id, "access token refreshed");

        Ok(RefreshTokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }

    /// Log out everywhere: revoke every live refresh token the user owns.
    /// Succeeds even when there was nothing to revoke.
    pub async fn logout(&self, user: &User) -> Result<u64, AppError> {
        let revoked = self.db.revoke_all_refresh_tokens(user.id).await?;

        tracing::info!(user_id = %user.id, tokens_revoked = revoked, "user logged out");

        Ok(revoked)
    }

    pub async fn change_password(
        &self,
        user: &User,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let current_ok = verify_password_blocking(
            Password::new(req.current_password.clone()),
            PasswordHashString::new(user.hashed_password.clone()),
        )
        .await?;

        if !current_ok {
            return Err(AppError::authentication(
                "INVALID_PASSWORD",
                "Current password is incorrect",
            ));
        }

        if req.current_password == req.new_password {
            return Err(AppError::bad_request(
                "SAME_PASSWORD",
                "New password must be different from current password",
            ));
        }

        let new_hash = hash_password_blocking(Password::new(req.new_password)).await?;
        self.db
            .update_user_password(user.id, new_hash.as_str())
            .await?;
        self.cache.invalidate(user.id);

        // Outstanding refresh tokens survive a password change; sessions on
        // other devices keep working until they expire or are logged out.
        tracing::info!(user_id = %user.id, "password changed");

        Ok(())
    }

    pub async fn update_profile(
        &self,
        user: User,
        req: UpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        let mut user = user;
        let mut changed = false;

        if let Some(email) = req.email {
            if email != user.email {
                if self.db.email_taken(&email, Some(user.id)).await? {
                    return Err(AppError::conflict("EMAIL_EXISTS", "Email already registered"));
                }
                user.email = email;
                // A new address has not been verified yet.
                user.is_verified = false;
                changed = true;
            }
        }

        if let Some(username) = req.username {
            if username != user.username {
                if self.db.username_taken(&username, Some(user.id)).await? {
                    return Err(AppError::conflict(
                        "USERNAME_EXISTS",
                        "Username already taken",
                    ));
                }
                user.username = username;
                changed = true;
            }
        }

        if changed {
            self.db.update_user_profile(&user).await?;
            self.cache.invalidate(user.id);
            user.updated_at = chrono::Utc::now();
            tracing::info!(user_id = %user.id, "user profile updated");
        }

        Ok(UserResponse::from(user))
    }

    /// Soft-delete the account and revoke every refresh token.
    pub async fn delete_account(&self, user: &User) -> Result<(), AppError> {
        let revoked = self.db.soft_delete_user(user.id).await?;
        self.cache.invalidate(user.id);

        tracing::info!(user_id = %user.id, tokens_revoked = revoked, "user account deleted");

        Ok(())
    }
}

fn invalid_refresh_token() -> AppError {
    AppError::authentication("INVALID_REFRESH_TOKEN", "Invalid or expired refresh token")
}

async fn verify_password_blocking(
    password: Password,
    hash: PasswordHashString,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password verification task failed: {}", e)))
}

async fn hash_password_blocking(password: Password) -> Result<PasswordHashString, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing task failed: {}", e)))?
        .map_err(AppError::Internal)
}
