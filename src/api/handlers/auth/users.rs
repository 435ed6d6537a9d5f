//! Account management under `/api/v1/auth`: owner listing, creation,
//! profile updates, deletion, and password changes.
//!
//! Route-level access is enforced by the policy gate before these handlers
//! run; the authenticated identity arrives as an explicit request extension.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::identity::AuthenticatedIdentity;
use super::password;
use super::state::AuthState;
use super::storage::{
    delete_user, insert_owner, list_owners, lookup_by_id, set_password, update_profile,
    CreateOutcome, NewOwner, ProfileUpdate, UpdateOutcome,
};
use super::types::{
    ChangePasswordRequest, CreateOwnerRequest, UpdateUserRequest, UserPage, UserResponse,
};

const DEFAULT_PAGE_SIZE: i64 = 5;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize)]
pub struct PageParams {
    page: Option<i64>,
    size: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/auth",
    params(
        ("page" = Option<i64>, Query, description = "Zero-based page index"),
        ("size" = Option<i64>, Query, description = "Page size (default 5)")
    ),
    responses(
        (status = 200, description = "One page of owner accounts, newest first", body = UserPage)
    ),
    tag = "auth"
)]
pub async fn list_users(
    pool: Extension<PgPool>,
    Query(params): Query<PageParams>,
) -> Response {
    let page = params.page.unwrap_or(0).max(0);
    let size = params
        .size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    match list_owners(&pool, page, size).await {
        Ok((owners, total)) => {
            let content = owners.into_iter().map(UserResponse::from).collect();
            Json(UserPage::new(content, page, size, total)).into_response()
        }
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account found", body = UserResponse),
        (status = 404, description = "No account with this id")
    ),
    tag = "auth"
)]
pub async fn get_user(pool: Extension<PgPool>, Path(id): Path<i64>) -> Response {
    match lookup_by_id(&pool, id).await {
        Ok(Some(record)) => Json(UserResponse::from(record)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/{id}",
    params(("id" = i64, Path, description = "Account id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 404, description = "No account with this id"),
        (status = 409, description = "Email or username already taken")
    ),
    tag = "auth"
)]
pub async fn update_user(
    pool: Extension<PgPool>,
    identity: Extension<AuthenticatedIdentity>,
    Path(id): Path<i64>,
    payload: Option<Json<UpdateUserRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let update = ProfileUpdate {
        email: request.email,
        username: request.username,
        full_name: request.full_name,
        phone_number: request.phone_number,
        active: request.active,
    };

    match update_profile(&pool, id, update).await {
        Ok(UpdateOutcome::Updated(record)) => {
            info!(
                "Account {id} updated by user id {updated_by}",
                updated_by = identity.id
            );
            Json(UserResponse::from(record)).into_response()
        }
        Ok(UpdateOutcome::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Ok(UpdateOutcome::Conflict(message)) => {
            (StatusCode::CONFLICT, Json(json!({ "message": message }))).into_response()
        }
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/auth/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "No account with this id")
    ),
    tag = "auth"
)]
pub async fn remove_user(pool: Extension<PgPool>, Path(id): Path<i64>) -> Response {
    match delete_user(&pool, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/create-owner",
    request_body = CreateOwnerRequest,
    responses(
        (status = 201, description = "Owner account created with the default password", body = UserResponse),
        (status = 409, description = "Email or username already taken")
    ),
    tag = "auth"
)]
pub async fn create_owner(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CreateOwnerRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if request.email.trim().is_empty() || request.username.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing email or username".to_string(),
        )
            .into_response();
    }

    // New owners start with the configured default password and are expected
    // to rotate it through the recovery flow.
    let password_hash = match password::hash(auth_state.config().default_owner_password()) {
        Ok(hash) => hash,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    let owner = NewOwner {
        email: request.email.trim().to_string(),
        username: request.username.trim().to_string(),
        password_hash,
        full_name: request.full_name,
        phone_number: request.phone_number,
    };

    match insert_owner(&pool, owner).await {
        Ok(CreateOutcome::Created(record)) => {
            info!("Owner account created with id {}", record.id);
            (StatusCode::CREATED, Json(UserResponse::from(record))).into_response()
        }
        Ok(CreateOutcome::Conflict(message)) => {
            (StatusCode::CONFLICT, Json(json!({ "message": message }))).into_response()
        }
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/auth/{id}/password",
    params(("id" = i64, Path, description = "Account id")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 404, description = "No account with this id")
    ),
    tag = "auth"
)]
pub async fn change_password(
    pool: Extension<PgPool>,
    identity: Extension<AuthenticatedIdentity>,
    Path(id): Path<i64>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if request.new_password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing new password".to_string()).into_response();
    }

    let password_hash = match password::hash(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    match set_password(&pool, id, &password_hash).await {
        Ok(true) => {
            info!(
                "Password changed for account {id} by user id {changed_by}",
                changed_by = identity.id
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/postgres")
            .unwrap()
    }

    fn identity() -> Extension<AuthenticatedIdentity> {
        Extension(AuthenticatedIdentity {
            id: 1,
            username: "javier".to_string(),
            full_name: None,
        })
    }

    #[tokio::test]
    async fn update_user_missing_payload_is_bad_request() {
        let response = update_user(Extension(lazy_pool()), identity(), Path(5), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_owner_requires_email_and_username() {
        let state = super::super::tests::auth_state();
        let response = create_owner(
            Extension(lazy_pool()),
            Extension(state),
            Some(Json(CreateOwnerRequest {
                email: " ".to_string(),
                username: "skipper".to_string(),
                full_name: None,
                phone_number: None,
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn change_password_rejects_empty_password() {
        let response = change_password(
            Extension(lazy_pool()),
            identity(),
            Path(5),
            Some(Json(ChangePasswordRequest {
                new_password: String::new(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
