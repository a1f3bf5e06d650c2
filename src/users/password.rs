//! Password hashing for the `users.password_hash` column.
//!
//! Registration, `PATCH /users/me` and the bootstrap superuser all store an
//! argon2id PHC string; token issuance is the only reader.

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Fresh salt per call, so two accounts with the same password never share a hash.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(plain.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => {
            error!(error = %e, "password hashing failed");
            Err(anyhow!("hash password: {e}"))
        }
    }
}

/// Whether `plain` matches a stored hash. A stored value that is not a PHC
/// string means the row is corrupt and is reported as an error rather than
/// as a failed login.
pub fn check_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash is unreadable");
        anyhow!("parse stored hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
