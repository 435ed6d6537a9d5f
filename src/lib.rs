//! # Flotilla (Fleet Management Auth Service)
//!
//! `flotilla` is the authentication and authorization back end of a fleet
//! management system (boats, owners, maintenance, payments). It owns
//! credential validation, signed-token issuance and verification, role-gated
//! route access, and the password-recovery ticket lifecycle.
//!
//! ## Authentication
//!
//! Logins validate a username/password pair against argon2 hashes and answer
//! with an HS256-signed token carrying the account id, username, single role
//! authority, display name, issuer, and a 30-day expiry. Inbound requests
//! present the token as a `Bearer` credential.
//!
//! ## Authorization
//!
//! Token verification never rejects a request by itself: failures downgrade
//! the request to anonymous, and a static, ordered policy table decides per
//! route whether anonymous or role-restricted access is acceptable.
//! Unauthorized callers are rejected before any handler runs.
//!
//! ## Password recovery
//!
//! Reset tickets are single-use random tokens with a one-hour expiry,
//! attached to the account row and delivered through a transactional email
//! outbox. The request stage is anti-enumeration: callers cannot tell
//! whether an email exists.

pub mod api;
pub mod cli;
pub mod token;

pub const GIT_COMMIT_HASH: &str = api::GIT_COMMIT_HASH;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
