//! Route authorization policy and the request gate middleware.
//!
//! Authentication and authorization are separate stages: the gate first
//! tries to reconstruct an identity from the bearer token (fail-open to
//! anonymous), then evaluates the static rule table below. The table is
//! ordered; the first rule whose method and path patterns match decides the
//! requirement. An unauthenticated caller on a non-open route is rejected
//! before any handler runs.

use axum::{
    extract::{Extension, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::deny;
use super::identity::{self, Role};
use super::state::AuthState;

/// Requirement attached to a route pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Open,
    Authenticated,
    Role(Role),
    AnyOf(&'static [Role]),
}

struct Rule {
    method: Option<&'static str>,
    pattern: &'static str,
    access: Access,
}

impl Rule {
    const fn method(method: &'static str, pattern: &'static str, access: Access) -> Self {
        Self {
            method: Some(method),
            pattern,
            access,
        }
    }

    const fn any(pattern: &'static str, access: Access) -> Self {
        Self {
            method: None,
            pattern,
            access,
        }
    }
}

/// Ordered policy table, first match wins.
const RULES: &[Rule] = &[
    Rule::method("OPTIONS", "/**", Access::Open),
    Rule::method("POST", "/api/v1/auth/login", Access::Open),
    Rule::method("POST", "/api/v1/auth/refresh-token", Access::Open),
    Rule::method("POST", "/api/v1/auth/forgot-password", Access::Open),
    Rule::method("POST", "/api/v1/auth/reset-password", Access::Open),
    Rule::method("GET", "/api/v1/auth/validate-reset-token", Access::Open),
    Rule::any("/", Access::Open),
    Rule::any("/health", Access::Open),
    Rule::any("/api-docs/**", Access::Open),
    Rule::any("/swagger-ui/**", Access::Open),
    Rule::any("/documents/**", Access::Open),
    Rule::method("GET", "/api/v1/boat/documents/**", Access::Open),
    Rule::any(
        "/api/v1/payments/*/download-receipt",
        Access::Authenticated,
    ),
    Rule::any("/api/v1/boat/documents/**", Access::Authenticated),
    Rule::any("/api/v1/reports/**", Access::Role(Role::Admin)),
    Rule::any("/api/v1/admin/**", Access::Role(Role::Admin)),
    Rule::method(
        "GET",
        "/api/v1/auth/*",
        Access::AnyOf(&[Role::Owner, Role::Admin]),
    ),
    Rule::method(
        "PUT",
        "/api/v1/auth/*",
        Access::AnyOf(&[Role::Owner, Role::Admin]),
    ),
    Rule::method(
        "PATCH",
        "/api/v1/auth/*/password",
        Access::AnyOf(&[Role::Owner, Role::Admin]),
    ),
    Rule::any("/api/v1/auth/**", Access::Role(Role::Admin)),
    Rule::any("/api/v1/payments/**", Access::Role(Role::Admin)),
    Rule::any("/api/v1/maintenances/**", Access::Role(Role::Admin)),
    Rule::any("/api/v1/owner/**", Access::Role(Role::Owner)),
    Rule::any("/api/v1/boat/**", Access::Role(Role::Admin)),
];

/// Outcome of evaluating the policy for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(StatusCode),
}

/// Match a route pattern against a request path.
///
/// Patterns are `/`-separated: a literal segment matches itself, `*` matches
/// exactly one segment, and a trailing `**` matches any remainder including
/// the empty one.
fn path_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.trim_matches('/').split('/');
    let mut path_segments = path.trim_matches('/').split('/');
    loop {
        match pattern_segments.next() {
            None => return path_segments.next().is_none(),
            Some("**") => return true,
            Some(expected) => match path_segments.next() {
                None => return false,
                Some(actual) => {
                    if expected != "*" && expected != actual {
                        return false;
                    }
                }
            },
        }
    }
}

fn requirement(method: &Method, path: &str) -> Access {
    for rule in RULES {
        if let Some(expected) = rule.method {
            if method.as_str() != expected {
                continue;
            }
        }
        if path_matches(rule.pattern, path) {
            return rule.access;
        }
    }
    // Catch-all: anything not listed requires an authenticated identity.
    Access::Authenticated
}

/// Evaluate the policy table for a request with an optional caller role.
#[must_use]
pub fn authorize(method: &Method, path: &str, role: Option<Role>) -> Decision {
    let access = requirement(method, path);
    match access {
        Access::Open => Decision::Allow,
        Access::Authenticated => match role {
            Some(_) => Decision::Allow,
            None => Decision::Deny(StatusCode::UNAUTHORIZED),
        },
        Access::Role(required) => match role {
            Some(actual) if actual == required => Decision::Allow,
            Some(_) => Decision::Deny(StatusCode::FORBIDDEN),
            None => Decision::Deny(StatusCode::UNAUTHORIZED),
        },
        Access::AnyOf(required) => match role {
            Some(actual) if required.contains(&actual) => Decision::Allow,
            Some(_) => Decision::Deny(StatusCode::FORBIDDEN),
            None => Decision::Deny(StatusCode::UNAUTHORIZED),
        },
    }
}

/// Per-request gate: authenticate (fail-open), then authorize.
///
/// On allow, the identity and role are attached to the request's extensions
/// so handlers receive them as explicit values. Preflight requests bypass
/// both stages.
pub async fn gate(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let authenticated = identity::try_authenticate(auth_state.codec(), request.headers());
    let role = authenticated.as_ref().map(|(_, role)| *role);

    match authorize(request.method(), request.uri().path(), role) {
        Decision::Allow => {
            if let Some((identity, role)) = authenticated {
                request.extensions_mut().insert(identity);
                request.extensions_mut().insert(role);
            }
            next.run(request).await
        }
        Decision::Deny(status) => deny(status).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matching_segments() {
        assert!(path_matches("/", "/"));
        assert!(path_matches("/**", "/anything/at/all"));
        assert!(path_matches("/api/v1/auth/login", "/api/v1/auth/login"));
        assert!(!path_matches("/api/v1/auth/login", "/api/v1/auth"));
        assert!(path_matches("/api/v1/auth/*", "/api/v1/auth/15"));
        assert!(!path_matches("/api/v1/auth/*", "/api/v1/auth"));
        assert!(!path_matches("/api/v1/auth/*", "/api/v1/auth/15/password"));
        assert!(path_matches("/api/v1/auth/*/password", "/api/v1/auth/15/password"));
        assert!(path_matches("/api/v1/auth/**", "/api/v1/auth"));
        assert!(path_matches("/api/v1/auth/**", "/api/v1/auth/anything/nested"));
        assert!(path_matches(
            "/api/v1/payments/*/download-receipt",
            "/api/v1/payments/99/download-receipt"
        ));
        assert!(!path_matches(
            "/api/v1/payments/*/download-receipt",
            "/api/v1/payments/99"
        ));
    }

    #[test]
    fn preflight_is_open() {
        assert_eq!(
            authorize(&Method::OPTIONS, "/api/v1/reports/summary", None),
            Decision::Allow
        );
    }

    #[test]
    fn login_and_recovery_routes_are_open() {
        for path in [
            "/api/v1/auth/login",
            "/api/v1/auth/refresh-token",
            "/api/v1/auth/forgot-password",
            "/api/v1/auth/reset-password",
        ] {
            assert_eq!(authorize(&Method::POST, path, None), Decision::Allow);
        }
        assert_eq!(
            authorize(&Method::GET, "/api/v1/auth/validate-reset-token", None),
            Decision::Allow
        );
    }

    #[test]
    fn boat_documents_open_for_get_only() {
        assert_eq!(
            authorize(&Method::GET, "/api/v1/boat/documents/42", None),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Method::POST, "/api/v1/boat/documents/42", None),
            Decision::Deny(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            authorize(&Method::POST, "/api/v1/boat/documents/42", Some(Role::Owner)),
            Decision::Allow
        );
    }

    #[test]
    fn receipt_download_requires_any_identity() {
        let path = "/api/v1/payments/7/download-receipt";
        assert_eq!(
            authorize(&Method::GET, path, None),
            Decision::Deny(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(authorize(&Method::GET, path, Some(Role::Owner)), Decision::Allow);
        assert_eq!(authorize(&Method::GET, path, Some(Role::Admin)), Decision::Allow);
    }

    #[test]
    fn reports_and_admin_routes_are_admin_only() {
        for path in ["/api/v1/reports/monthly", "/api/v1/admin/anything"] {
            assert_eq!(authorize(&Method::GET, path, Some(Role::Admin)), Decision::Allow);
            assert_eq!(
                authorize(&Method::GET, path, Some(Role::Owner)),
                Decision::Deny(StatusCode::FORBIDDEN)
            );
            assert_eq!(
                authorize(&Method::GET, path, None),
                Decision::Deny(StatusCode::UNAUTHORIZED)
            );
        }
    }

    #[test]
    fn account_by_id_allows_owner_or_admin() {
        assert_eq!(
            authorize(&Method::GET, "/api/v1/auth/15", Some(Role::Owner)),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Method::PUT, "/api/v1/auth/15", Some(Role::Admin)),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Method::PATCH, "/api/v1/auth/15/password", Some(Role::Owner)),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Method::GET, "/api/v1/auth/15", None),
            Decision::Deny(StatusCode::UNAUTHORIZED)
        );
    }

    #[test]
    fn remaining_auth_routes_are_admin_only() {
        // Listing and owner creation fall through to the auth catch-all.
        assert_eq!(
            authorize(&Method::GET, "/api/v1/auth", Some(Role::Owner)),
            Decision::Deny(StatusCode::FORBIDDEN)
        );
        assert_eq!(
            authorize(&Method::GET, "/api/v1/auth", Some(Role::Admin)),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Method::POST, "/api/v1/auth/create-owner", Some(Role::Owner)),
            Decision::Deny(StatusCode::FORBIDDEN)
        );
        assert_eq!(
            authorize(&Method::DELETE, "/api/v1/auth/15", Some(Role::Owner)),
            Decision::Deny(StatusCode::FORBIDDEN)
        );
        assert_eq!(
            authorize(&Method::DELETE, "/api/v1/auth/15", Some(Role::Admin)),
            Decision::Allow
        );
    }

    #[test]
    fn domain_catch_alls_by_role() {
        for path in [
            "/api/v1/payments/55",
            "/api/v1/maintenances",
            "/api/v1/boat/3",
        ] {
            assert_eq!(authorize(&Method::GET, path, Some(Role::Admin)), Decision::Allow);
            assert_eq!(
                authorize(&Method::GET, path, Some(Role::Owner)),
                Decision::Deny(StatusCode::FORBIDDEN)
            );
        }

        assert_eq!(
            authorize(&Method::GET, "/api/v1/owner/boats", Some(Role::Owner)),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Method::GET, "/api/v1/owner/boats", Some(Role::Admin)),
            Decision::Deny(StatusCode::FORBIDDEN)
        );
    }

    #[test]
    fn unknown_routes_require_authentication() {
        assert_eq!(
            authorize(&Method::GET, "/api/v1/something-else", None),
            Decision::Deny(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            authorize(&Method::GET, "/api/v1/something-else", Some(Role::Owner)),
            Decision::Allow
        );
    }

    #[test]
    fn docs_and_static_paths_are_open() {
        for path in [
            "/",
            "/health",
            "/api-docs/openapi.json",
            "/swagger-ui/index.html",
            "/documents/boat-42.pdf",
        ] {
            assert_eq!(authorize(&Method::GET, path, None), Decision::Allow);
        }
    }
}
