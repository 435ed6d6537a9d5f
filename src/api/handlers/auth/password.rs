//! Credential hashing (argon2id, PHC string format).

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::rngs::OsRng;

/// Hash a raw password with a fresh random salt.
///
/// # Errors
///
/// Returns an error if the hasher rejects its inputs.
pub(crate) fn hash(raw: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hashed| hashed.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Constant-time verification of a raw password against a stored hash.
///
/// Unparsable stored hashes count as a mismatch rather than an error: a
/// corrupt credential row must never let a login through.
pub(crate) fn verify(raw: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(raw.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() -> Result<()> {
        let hashed = hash("admin123")?;
        assert!(verify("admin123", &hashed));
        assert!(!verify("admin124", &hashed));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash("owner123")?;
        let second = hash("owner123")?;
        assert_ne!(first, second);
        assert!(verify("owner123", &first));
        assert!(verify("owner123", &second));
        Ok(())
    }

    #[test]
    fn garbage_stored_hash_never_verifies() {
        assert!(!verify("admin123", "not-a-phc-string"));
        assert!(!verify("admin123", ""));
    }
}
