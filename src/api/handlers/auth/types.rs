//! Request/response types for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::identity::Role;
use super::storage::UserRecord;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

/// Login response: the `status` flag mirrors the envelope convention
/// (`true` on success).
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub message: String,
    pub token: String,
    pub status: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshTokenRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshTokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Recovery-flow responses carry a human-readable message and a success
/// flag, never the underlying failure detail.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordResetResponse {
    pub message: String,
    pub success: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateOwnerRequest {
    pub email: String,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    pub active: Option<bool>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// External representation of an account.
///
/// The password hash and the reset-ticket fields are deliberately absent;
/// they never serialize to any external shape.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub active: bool,
    #[serde(rename = "uniqueId")]
    pub unique_id: Option<Uuid>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
}

impl From<UserRecord> for UserResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            username: record.username,
            role: record.role,
            active: record.active,
            unique_id: record.unique_id,
            full_name: record.full_name,
            phone_number: record.phone_number,
        }
    }
}

/// One page of the owner listing, newest account first.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserPage {
    pub content: Vec<UserResponse>,
    pub page: i64,
    pub size: i64,
    #[serde(rename = "totalElements")]
    pub total_elements: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl UserPage {
    #[must_use]
    pub fn new(content: Vec<UserResponse>, page: i64, size: i64, total_elements: i64) -> Self {
        let total_pages = if size > 0 {
            (total_elements + size - 1) / size
        } else {
            0
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}
