//! Credential login and token refresh.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::AuthError;
use super::identity::{AuthenticatedIdentity, Role};
use super::password;
use super::state::AuthState;
use super::storage::{lookup_by_username, UserRecord};
use super::types::{AuthRequest, AuthResponse, RefreshTokenRequest, RefreshTokenResponse};

/// Validate a raw password against a looked-up account.
///
/// Order matters: absence short-circuits before the inactive check, which
/// short-circuits before the (intentionally slow) hash comparison.
fn check_credentials(
    record: Option<UserRecord>,
    raw_password: &str,
) -> Result<(AuthenticatedIdentity, Role), AuthError> {
    let record = record.ok_or(AuthError::UserNotFound)?;
    if !record.active {
        return Err(AuthError::UserInactive);
    }
    if !password::verify(raw_password, &record.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }
    Ok((
        AuthenticatedIdentity {
            id: record.id,
            username: record.username,
            full_name: record.full_name,
        },
        record.role,
    ))
}

/// Verify a username/password pair against the credential store.
///
/// Read-only; no login counters or timestamps are updated.
pub(crate) async fn authenticate(
    pool: &PgPool,
    username: &str,
    raw_password: &str,
) -> Result<(AuthenticatedIdentity, Role), AuthError> {
    let record = lookup_by_username(pool, username)
        .await
        .map_err(AuthError::Internal)?;
    check_credentials(record, raw_password)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Successful login", body = AuthResponse),
        (status = 401, description = "Invalid credentials or inactive user", body = super::error::ErrorEnvelope),
        (status = 404, description = "User not found", body = super::error::ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<AuthRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing username or password".to_string(),
        )
            .into_response();
    }

    let (identity, role) = match authenticate(&pool, username, &request.password).await {
        Ok(authenticated) => authenticated,
        Err(err) => {
            debug!("Login rejected for {username}: {}", err.error_code());
            return err.into_response();
        }
    };

    let token = match auth_state.codec().issue_access_token(
        identity.id,
        &identity.username,
        role.authority(),
        identity.full_name.as_deref(),
    ) {
        Ok(token) => token,
        Err(err) => return AuthError::Internal(err.into()).into_response(),
    };

    info!("Login successful for user id {}", identity.id);

    Json(AuthResponse {
        id: identity.id,
        username: identity.username,
        role,
        message: "Login successful".to_string(),
        token,
        status: true,
    })
    .into_response()
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token issued", body = RefreshTokenResponse),
        (status = 401, description = "Invalid or expired refresh token", body = super::error::ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    // Every failure collapses into the same 401: a refresh token is a bearer
    // credential, not a username assertion, so no precise reason leaks out.
    let Ok(claims) = auth_state.codec().verify(&request.refresh_token) else {
        return AuthError::InvalidRefreshToken.into_response();
    };

    let record = match lookup_by_username(&pool, &claims.sub).await {
        Ok(Some(record)) if record.active => record,
        Ok(_) => return AuthError::InvalidRefreshToken.into_response(),
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    let access_token = match auth_state.codec().issue_access_token(
        record.id,
        &record.username,
        record.role.authority(),
        record.full_name.as_deref(),
    ) {
        Ok(token) => token,
        Err(err) => return AuthError::Internal(err.into()).into_response(),
    };

    Json(RefreshTokenResponse { access_token }).into_response()
}
