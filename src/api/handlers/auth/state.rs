//! Auth configuration and shared per-process state.

use secrecy::{ExposeSecret, SecretString};

use crate::token;

const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_OWNER_PASSWORD: &str = "owner123";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    issuer: String,
    frontend_base_url: String,
    token_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    default_owner_password: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(issuer: String, frontend_base_url: String) -> Self {
        Self {
            issuer,
            frontend_base_url,
            token_ttl_seconds: token::TOKEN_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            default_owner_password: DEFAULT_OWNER_PASSWORD.to_string(),
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_default_owner_password(mut self, password: String) -> Self {
        self.default_owner_password = password;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    pub(super) fn default_owner_password(&self) -> &str {
        &self.default_owner_password
    }

    fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }
}

/// Shared auth state: configuration plus the token codec keyed with the
/// server secret. The secret is consumed at construction and never surfaces
/// in logs or serialized output.
pub struct AuthState {
    config: AuthConfig,
    codec: token::Codec,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, secret: &SecretString) -> Self {
        let codec = token::Codec::new(
            secret.expose_secret().as_bytes().to_vec(),
            config.issuer().to_string(),
        )
        .with_ttl_seconds(config.token_ttl_seconds());
        Self { config, codec }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn codec(&self) -> &token::Codec {
        &self.codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_overrides() {
        let config = AuthConfig::new(
            "flotilla".to_string(),
            "https://fleet.example.test".to_string(),
        );

        assert_eq!(config.issuer(), "flotilla");
        assert_eq!(config.frontend_base_url(), "https://fleet.example.test");
        assert_eq!(config.token_ttl_seconds(), token::TOKEN_TTL_SECONDS);
        assert_eq!(
            config.reset_token_ttl_seconds(),
            DEFAULT_RESET_TOKEN_TTL_SECONDS
        );
        assert_eq!(config.default_owner_password(), DEFAULT_OWNER_PASSWORD);

        let config = config
            .with_token_ttl_seconds(120)
            .with_reset_token_ttl_seconds(30)
            .with_default_owner_password("fresh-keel".to_string());

        assert_eq!(config.token_ttl_seconds(), 120);
        assert_eq!(config.reset_token_ttl_seconds(), 30);
        assert_eq!(config.default_owner_password(), "fresh-keel");
    }

    #[test]
    fn state_builds_codec_from_secret() {
        let config = AuthConfig::new(
            "flotilla.test".to_string(),
            "https://fleet.example.test".to_string(),
        );
        let state = AuthState::new(config, &SecretString::from("test-secret"));
        let token = state
            .codec()
            .issue_access_token(1, "javier", "ROLE_ADMIN", None)
            .unwrap();
        let claims = state.codec().verify(&token).unwrap();
        assert_eq!(claims.iss, "flotilla.test");
    }
}
