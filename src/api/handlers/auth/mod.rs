//! Authentication and authorization core.
//!
//! Two-stage request pipeline: the gate middleware first tries to
//! reconstruct an identity from the bearer token (failures are swallowed and
//! the request continues unauthenticated), then the static policy table
//! decides whether the route admits the caller. Identity is carried as an
//! explicit per-request value, never process-global state.
//!
//! Credential validation, token issuance, the password-recovery ticket
//! lifecycle, and the `/api/v1/auth` account-management endpoints live here.

pub(crate) mod error;
pub(crate) mod identity;
pub(crate) mod login;
mod password;
pub(crate) mod policy;
pub(crate) mod recovery;
mod state;
mod storage;
pub(crate) mod types;
pub(crate) mod users;
mod utils;

pub use identity::{AuthenticatedIdentity, Role};
pub use policy::{authorize, Access, Decision};
pub use state::{AuthConfig, AuthState};

pub(crate) use password::hash as hash_password;

#[cfg(test)]
pub(crate) mod tests {
    use super::state::{AuthConfig, AuthState};
    use secrecy::SecretString;
    use std::sync::Arc;

    /// Shared fixture for handler tests that never reach the database.
    pub(crate) fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new(
            "flotilla.test".to_string(),
            "https://fleet.example.test".to_string(),
        );
        Arc::new(AuthState::new(config, &SecretString::from("test-secret")))
    }
}
