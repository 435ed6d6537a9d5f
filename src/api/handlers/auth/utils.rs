//! Small helpers for reset-token generation and input validation.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;

/// Normalize an email for lookup.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Create a fresh password-reset token.
///
/// 32 bytes from the OS RNG, base64url encoded: large enough that guessing
/// or colliding with an outstanding ticket is negligible. The raw value only
/// travels in the reset email.
pub(super) fn generate_reset_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Build the frontend reset link included in outbound emails.
pub(super) fn build_reset_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/reset-password.html?token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Javier@Fleet.COM "), "javier@fleet.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("owner@fleet.example"));
        assert!(valid_email("name.surname@fleet.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.fleet.example"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn reset_tokens_are_long_and_distinct() -> Result<()> {
        let first = generate_reset_token()?;
        let second = generate_reset_token()?;
        assert_ne!(first, second);
        let decoded = Base64UrlUnpadded::decode_vec(&first)
            .context("reset token should be valid base64url")?;
        assert_eq!(decoded.len(), 32);
        Ok(())
    }

    #[test]
    fn build_reset_url_trims_trailing_slash() {
        let url = build_reset_url("https://fleet.example.test/", "token");
        assert_eq!(
            url,
            "https://fleet.example.test/reset-password.html?token=token"
        );
    }
}
