use crate::api;
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub jwt_issuer: String,
    pub frontend_base_url: String,
    pub token_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub owner_default_password: String,
    pub email_outbox_poll_seconds: u64,
    pub email_outbox_batch_size: usize,
    pub email_outbox_max_attempts: u32,
    pub email_outbox_backoff_base_seconds: u64,
    pub email_outbox_backoff_max_seconds: u64,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &self.dsn)
            .field("jwt_secret", &"***")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("frontend_base_url", &self.frontend_base_url)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("reset_token_ttl_seconds", &self.reset_token_ttl_seconds)
            .field("owner_default_password", &"***")
            .finish_non_exhaustive()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = api::handlers::auth::AuthConfig::new(
        args.jwt_issuer,
        args.frontend_base_url,
    )
    .with_token_ttl_seconds(args.token_ttl_seconds)
    .with_reset_token_ttl_seconds(args.reset_token_ttl_seconds)
    .with_default_owner_password(args.owner_default_password);

    let auth_state = Arc::new(api::handlers::auth::AuthState::new(
        auth_config,
        &args.jwt_secret,
    ));

    let email_config = api::EmailWorkerConfig::new()
        .with_poll_interval_seconds(args.email_outbox_poll_seconds)
        .with_batch_size(args.email_outbox_batch_size)
        .with_max_attempts(args.email_outbox_max_attempts)
        .with_backoff_seconds(
            args.email_outbox_backoff_base_seconds,
            args.email_outbox_backoff_max_seconds,
        );

    api::new(args.port, args.dsn, auth_state, email_config).await
}
