pub mod auth;
pub mod cache;
pub mod database;
pub mod jwt;
pub mod rate_limit;

pub use auth::AuthService;
pub use cache::UserCache;
pub use database::Database;
pub use jwt::{JwtService, TokenClaims, TokenType};
pub use rate_limit::{LoginRateLimiter, RateLimitDecision};
