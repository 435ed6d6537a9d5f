//! Undocumented root route.

use axum::response::IntoResponse;

use crate::api::APP_USER_AGENT;

pub async fn root() -> impl IntoResponse {
    APP_USER_AGENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_returns_app_identifier() {
        let response = root().await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
