//! Request identity: account roles and bearer-token authentication.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::token;

/// Permission tier assigned to an account. Exactly one per account.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "OWNER")]
    Owner,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Owner => "OWNER",
        }
    }

    /// Wire authority string carried in the token's `role` claim.
    #[must_use]
    pub const fn authority(self) -> &'static str {
        match self {
            Self::Admin => "ROLE_ADMIN",
            Self::Owner => "ROLE_OWNER",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ADMIN" => Some(Self::Admin),
            "OWNER" => Some(Self::Owner),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_authority(authority: &str) -> Option<Self> {
        match authority {
            "ROLE_ADMIN" => Some(Self::Admin),
            "ROLE_OWNER" => Some(Self::Owner),
            _ => None,
        }
    }
}

/// Identity of the authenticated caller for one request.
///
/// Produced by credential validation or token verification and passed down
/// the call chain as an explicit value (request extension), never held in
/// process-wide state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
}

/// Extract the bearer credential from the standard authorization header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Reconstruct the caller's identity and role from a bearer token, if any.
///
/// Absent header, malformed, expired, or tampered tokens and unknown role
/// claims all yield `None`: the request continues unauthenticated and the
/// authorization policy decides whether that is acceptable for the route.
pub(crate) fn try_authenticate(
    codec: &token::Codec,
    headers: &HeaderMap,
) -> Option<(AuthenticatedIdentity, Role)> {
    let bearer = bearer_token(headers)?;
    let claims = codec.verify(&bearer).ok()?;
    let role = Role::from_authority(&claims.role)?;
    let identity = AuthenticatedIdentity {
        id: claims.user_id,
        username: claims.sub,
        full_name: claims.full_name,
    };
    Some((identity, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn codec() -> token::Codec {
        token::Codec::new(b"test-secret".to_vec(), "flotilla.test".to_string())
    }

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}")).unwrap();
        headers.insert(AUTHORIZATION, value);
        headers
    }

    #[test]
    fn role_authority_round_trip() {
        for role in [Role::Admin, Role::Owner] {
            assert_eq!(Role::from_authority(role.authority()), Some(role));
            assert_eq!(Role::from_name(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_authority("ROLE_USER"), None);
        assert_eq!(Role::from_name("USER"), None);
    }

    #[test]
    fn bearer_token_parses_header_variants() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  xyz "));
        assert_eq!(bearer_token(&headers), Some("xyz".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn try_authenticate_round_trips_identity() {
        let codec = codec();
        let token = codec
            .issue_access_token(7, "javier", "ROLE_ADMIN", Some("Javier Albarracin"))
            .unwrap();

        let (identity, role) = try_authenticate(&codec, &headers_with_bearer(&token)).unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(identity.id, 7);
        assert_eq!(identity.username, "javier");
        assert_eq!(identity.full_name.as_deref(), Some("Javier Albarracin"));
    }

    #[test]
    fn try_authenticate_fails_open_to_anonymous() {
        let codec = codec();

        // No header at all.
        assert!(try_authenticate(&codec, &HeaderMap::new()).is_none());

        // Garbage token.
        assert!(try_authenticate(&codec, &headers_with_bearer("not-a-token")).is_none());

        // Signed with a different secret.
        let other = token::Codec::new(b"other-secret".to_vec(), "flotilla.test".to_string());
        let forged = other
            .issue_access_token(7, "javier", "ROLE_ADMIN", None)
            .unwrap();
        assert!(try_authenticate(&codec, &headers_with_bearer(&forged)).is_none());

        // Valid signature but an unknown role claim.
        let odd_role = codec
            .issue_access_token(7, "javier", "ROLE_CAPTAIN", None)
            .unwrap();
        assert!(try_authenticate(&codec, &headers_with_bearer(&odd_role)).is_none());
    }
}
