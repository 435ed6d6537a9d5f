//! Password-recovery flow: request, reset, validate.
//!
//! Every branch answers with `{message, success}` only. The request stage is
//! anti-enumeration by construction: unknown emails, invalid emails, and
//! internal failures all produce the exact same body as the happy path, so a
//! caller cannot learn whether an account exists.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::password;
use super::state::AuthState;
use super::storage::{consume_reset_ticket, issue_reset_ticket, reset_ticket_valid};
use super::types::{ForgotPasswordRequest, PasswordResetResponse, ResetPasswordRequest};
use super::utils::{generate_reset_token, normalize_email, valid_email};

const REQUEST_RESET_MESSAGE: &str =
    "If the email exists in our system, you will receive password reset instructions shortly";
const RESET_SUCCESS_MESSAGE: &str =
    "Your password has been reset successfully. You can now sign in with your new password";
const INVALID_TICKET_MESSAGE: &str = "Invalid or expired reset token";

fn reset_response(message: &str, success: bool) -> Response {
    Json(PasswordResetResponse {
        message: message.to_string(),
        success,
    })
    .into_response()
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request processed; body is identical whether or not the email exists", body = PasswordResetResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        // Same body as the happy path; malformed input must not probe.
        return reset_response(REQUEST_RESET_MESSAGE, true);
    }

    let token = match generate_reset_token() {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to generate reset token: {err:#}");
            return reset_response(REQUEST_RESET_MESSAGE, true);
        }
    };

    match issue_reset_ticket(&pool, &email, &token, auth_state.config()).await {
        Ok(true) => info!("Password reset ticket issued"),
        Ok(false) => info!("Password reset requested for unknown email"),
        Err(err) => {
            // Internal failure, not "user not found"; the distinction lives
            // in the logs only.
            error!("Failed to issue reset ticket: {err:#}");
        }
    }

    reset_response(REQUEST_RESET_MESSAGE, true)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Reset attempt outcome; success=false on invalid or expired token", body = PasswordResetResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let token = request.token.trim();
    if token.is_empty() || request.new_password.is_empty() {
        return reset_response(INVALID_TICKET_MESSAGE, false);
    }

    let password_hash = match password::hash(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash new password: {err:#}");
            return reset_response(INVALID_TICKET_MESSAGE, false);
        }
    };

    match consume_reset_ticket(&pool, token, &password_hash).await {
        Ok(true) => {
            info!("Password reset completed");
            reset_response(RESET_SUCCESS_MESSAGE, true)
        }
        Ok(false) => reset_response(INVALID_TICKET_MESSAGE, false),
        Err(err) => {
            error!("Failed to consume reset ticket: {err:#}");
            reset_response(INVALID_TICKET_MESSAGE, false)
        }
    }
}

#[derive(Deserialize)]
pub struct ValidateTokenParams {
    token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/validate-reset-token",
    params(
        ("token" = String, Query, description = "Reset token received by email")
    ),
    responses(
        (status = 200, description = "Whether the token is valid and unexpired", body = PasswordResetResponse)
    ),
    tag = "auth"
)]
pub async fn validate_reset_token(
    pool: Extension<PgPool>,
    Query(params): Query<ValidateTokenParams>,
) -> Response {
    let token = params.token.unwrap_or_default();
    let token = token.trim();
    if token.is_empty() {
        return reset_response(INVALID_TICKET_MESSAGE, false);
    }

    match reset_ticket_valid(&pool, token).await {
        Ok(true) => reset_response("Token is valid", true),
        Ok(false) => reset_response(INVALID_TICKET_MESSAGE, false),
        Err(err) => {
            error!("Failed to validate reset ticket: {err:#}");
            reset_response(INVALID_TICKET_MESSAGE, false)
        }
    }
}
