//! Auth error taxonomy and its translation to HTTP envelopes.
//!
//! Login-path failures surface a precise reason (the caller already asserted
//! a specific username); every envelope carries a machine error code and a
//! timestamp but never the underlying error detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::token;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials. Check your username and password.")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("User is inactive. Contact the administrator.")]
    UserInactive,
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::UserInactive | Self::InvalidRefreshToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials | Self::InvalidRefreshToken => "INVALID_CREDENTIALS",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::UserInactive => "USER_INACTIVE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Envelope for security failures: `{success, message, errorCode, status,
/// timestamp}` with a Unix-seconds timestamp.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(rename = "errorCode")]
    pub error_code: String,
    pub status: u16,
    pub timestamp: i64,
}

impl ErrorEnvelope {
    fn new(status: StatusCode, message: String, error_code: &str) -> Self {
        Self {
            success: false,
            message,
            error_code: error_code.to_string(),
            status: status.as_u16(),
            timestamp: token::now_unix_seconds(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            // Detail stays in the logs; the caller gets the generic message.
            error!("Internal auth failure: {err:#}");
        }
        let status = self.status();
        let envelope = ErrorEnvelope::new(status, self.to_string(), self.error_code());
        (status, Json(envelope)).into_response()
    }
}

/// Envelope for policy-gate denials (401 without identity, 403 with one).
pub(crate) fn deny(status: StatusCode) -> Response {
    let (message, error_code) = if status == StatusCode::FORBIDDEN {
        ("Access denied", "FORBIDDEN")
    } else {
        ("Authentication required", "UNAUTHORIZED")
    };
    let envelope = ErrorEnvelope::new(status, message.to_string(), error_code);
    (status, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_and_code_pairs() {
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidCredentials.error_code(), "INVALID_CREDENTIALS");
        assert_eq!(AuthError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::UserNotFound.error_code(), "USER_NOT_FOUND");
        assert_eq!(AuthError::UserInactive.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::UserInactive.error_code(), "USER_INACTIVE");
        assert_eq!(
            AuthError::InvalidRefreshToken.error_code(),
            "INVALID_CREDENTIALS"
        );
        let internal = AuthError::Internal(anyhow!("boom"));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn internal_error_hides_detail() {
        let internal = AuthError::Internal(anyhow!("connection refused"));
        assert_eq!(internal.to_string(), "Internal server error");
    }

    #[test]
    fn deny_envelope_shape() {
        let response = deny(StatusCode::UNAUTHORIZED);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = deny(StatusCode::FORBIDDEN);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn envelope_serializes_error_code_key() {
        let envelope = ErrorEnvelope::new(
            StatusCode::UNAUTHORIZED,
            "nope".to_string(),
            "INVALID_CREDENTIALS",
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["errorCode"], "INVALID_CREDENTIALS");
        assert_eq!(value["success"], false);
        assert_eq!(value["status"], 401);
    }
}
