use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Newtype for password to prevent accidental logging
#[derive(Debug, Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Newtype for password hash
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash a password using Argon2id.
///
/// Salt is freshly generated per call, so hashing the same input twice
/// yields different digests.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Verify a password against a stored hash.
///
/// Returns false, never an error, on mismatch or a malformed digest; an
/// empty password always fails.
pub fn verify_password(password: &Password, password_hash: &PasswordHashString) -> bool {
    if password.as_str().is_empty() {
        return false;
    }

    let Ok(parsed_hash) = PasswordHash::new(password_hash.as_str()) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok()
}
