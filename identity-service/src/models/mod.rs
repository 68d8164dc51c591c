pub mod login_attempt;
pub mod refresh_token;
pub mod user;

pub use login_attempt::LoginAttempt;
pub use refresh_token::RefreshToken;
pub use user::{User, UserState};
