//! Login rate limiting.
//!
//! Sliding window over the append-only `login_attempts` log, keyed by
//! (email, ip). Each check recomputes the window from the log instead of
//! maintaining a mutable counter: concurrent requests cannot lose updates,
//! and the log doubles as the audit trail. Cost is one O(window) count per
//! check, which is fine at per-identifier attempt rates.
//!
//! Check-then-record is deliberately not serialized across requests: two
//! concurrent logins for one identifier may both pass the check before
//! either records. The threshold is a guard-rail, not a hard cap.

use chrono::{DateTime, Duration, Utc};
use service_core::error::AppError;

use crate::config::RateLimitConfig;
use crate::models::LoginAttempt;
use crate::services::Database;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: i64,
    /// When a denied caller may try again: oldest in-window failure + window.
    pub retry_after: Option<DateTime<Utc>>,
}

/// Sliding-window limiter over recent failed login attempts.
#[derive(Debug, Clone)]
pub struct LoginRateLimiter {
    max_failures: i64,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_failures: i64::from(config.login_max_failures),
            window: Duration::minutes(config.login_window_minutes),
        }
    }

    /// Check whether a login attempt for this (email, ip) pair is allowed.
    pub async fn check(
        &self,
        db: &Database,
        email: &str,
        ip_address: &str,
    ) -> Result<RateLimitDecision, AppError> {
        let window_start = Utc::now() - self.window;
        let failed = db
            .count_recent_failed_attempts(email, ip_address, window_start)
            .await?;

        let oldest = if failed >= self.max_failures {
            db.oldest_failed_attempt_since(email, ip_address, window_start)
                .await?
        } else {
            None
        };

        Ok(self.evaluate(failed, oldest))
    }

    /// Record one attempt. Called for successes and failures alike so the
    /// window slides as old failures age out; a success never clears prior
    /// failures, it simply doesn't count toward the threshold.
    pub async fn record(&self, db: &Database, attempt: &LoginAttempt) -> Result<(), AppError> {
        db.insert_login_attempt(attempt).await
    }

    /// Pure decision from the observed window state.
    fn evaluate(&self, failed: i64, oldest_failure: Option<DateTime<Utc>>) -> RateLimitDecision {
        if failed < self.max_failures {
            RateLimitDecision {
                allowed: true,
                remaining: self.max_failures - failed,
                retry_after: None,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after: oldest_failure.map(|at| at + self.window),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> LoginRateLimiter {
        LoginRateLimiter::new(&RateLimitConfig {
            login_max_failures: 15,
            login_window_minutes: 15,
            global_ip_limit: 100,
            global_ip_window_seconds: 60,
        })
    }

    #[test]
    fn under_threshold_is_allowed_with_remaining() {
        let decision = limiter().evaluate(0, None);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 15);

        let decision = limiter().evaluate(14, None);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.retry_after, None);
    }

    #[test]
    fn at_threshold_is_denied_with_retry_after() {
        let oldest = Utc::now() - Duration::minutes(10);
        let decision = limiter().evaluate(15, Some(oldest));

        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.retry_after, Some(oldest + Duration::minutes(15)));
    }

    #[test]
    fn retry_after_is_in_the_future_while_window_holds() {
        let oldest = Utc::now() - Duration::minutes(5);
        let decision = limiter().evaluate(20, Some(oldest));

        assert!(decision.retry_after.unwrap() > Utc::now());
    }

    #[test]
    fn denied_without_oldest_row_has_no_retry_hint() {
        // The oldest row can age out between the count and the read.
        let decision = limiter().evaluate(15, None);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after, None);
    }
}
