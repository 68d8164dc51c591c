use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT service for token generation and validation.
///
/// Tokens are self-contained: `{sub, type, iat, exp}` signed with HS256 and a
/// process-wide secret. Revocation state is the ledger's concern, never the
/// codec's.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Bearer token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Token kind, discriminating access from refresh
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl TokenClaims {
    pub fn subject(&self) -> Result<Uuid, anyhow::Error> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow::anyhow!("Invalid token subject: {}", e))
    }
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    /// Generate a short-lived access token for a user.
    pub fn generate_access_token(&self, user_id: Uuid) -> Result<String, anyhow::Error> {
        self.issue(
            user_id,
            TokenType::Access,
            Duration::minutes(self.access_token_expiry_minutes),
        )
    }

    /// Generate a long-lived refresh token for a user.
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String, anyhow::Error> {
        self.issue(
            user_id,
            TokenType::Refresh,
            Duration::days(self.refresh_token_expiry_days),
        )
    }

    fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))
    }

    /// Decode and verify signature and expiry. Does not check the token kind.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid token: {}", e))?;

        Ok(token_data.claims)
    }

    /// Decode and require an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(anyhow::anyhow!("Invalid token type"));
        }
        Ok(claims)
    }

    /// Decode and require a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(anyhow::anyhow!("Invalid token type"));
        }
        Ok(claims)
    }

    /// Access token expiry in seconds (for the `expires_in` response field).
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        })
    }

    #[test]
    fn access_token_round_trips_subject_and_type() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let token = service.generate_access_token(user_id).unwrap();
        let claims = service.validate_access_token(&token).unwrap();

        assert_eq!(claims.subject().unwrap(), user_id);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_round_trips() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let token = service.generate_refresh_token(user_id).unwrap();
        let claims = service.validate_refresh_token(&token).unwrap();

        assert_eq!(claims.subject().unwrap(), user_id);
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn token_kind_is_enforced() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let access = service.generate_access_token(user_id).unwrap();
        let refresh = service.generate_refresh_token(user_id).unwrap();

        assert!(service.validate_refresh_token(&access).is_err());
        assert!(service.validate_access_token(&refresh).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = test_service();
        // Two minutes in the past, beyond the default 60s decoding leeway.
        let token = service
            .issue(Uuid::new_v4(), TokenType::Access, Duration::minutes(-2))
            .unwrap();

        assert!(service.decode(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = test_service();
        let token = service.generate_access_token(Uuid::new_v4()).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(service.decode(&tampered).is_err());

        let other = JwtService::new(&JwtConfig {
            secret: "another-secret-another-secret-32".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        });
        assert!(other.decode(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let service = test_service();
        assert!(service.decode("not-a-jwt").is_err());
        assert!(service.decode("").is_err());
    }

    #[test]
    fn expiry_seconds_reflect_config() {
        assert_eq!(test_service().access_token_expiry_seconds(), 900);
    }
}
