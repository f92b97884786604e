use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::StoreError;

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

fn password_error(context: &'static str, e: argon2::password_hash::Error) -> StoreError {
    error!(error = %e, "{context}");
    StoreError::Password(e.to_string())
}

/// PHC-encoded argon2id hash, stored in `users.password_hash`.
pub fn hash_password(plain: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| password_error("cannot hash user password", e))
}

/// Checks `plain` against a user's stored hash. A user without one never
/// matches; a stored value that is not a PHC string is an error.
pub fn verify_stored_password(plain: &str, stored: Option<&str>) -> Result<bool, StoreError> {
    let Some(stored) = stored else {
        return Ok(false);
    };
    let parsed =
        PasswordHash::new(stored).map_err(|e| password_error("corrupt stored password hash", e))?;
    Ok(hasher().verify_password(plain.as_bytes(), &parsed).is_ok())
}
