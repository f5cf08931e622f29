//! Per-request authorization header derivation.
//!
//! Two mutually exclusive schemes exist, selected by deployment
//! configuration: a bearer token issued at login, or an encoded
//! username/secret pair synthesized on every authenticated request. A
//! request that cannot be authenticated still goes out with the JSON
//! content type and no `Authorization` header; the server's response is
//! what surfaces the failure, never a local error.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Which authorization scheme the active deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`, token issued at login.
    Bearer,
    /// `Authorization: Basic <base64(username:secret)>`, synthesized per
    /// request from the stored credential pair, independent of any token.
    Basic,
}

/// Headers derived for one outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    /// Always `application/json`.
    pub content_type: &'static str,
    /// `Authorization` value, when one could be derived.
    pub authorization: Option<String>,
}

/// Derives request headers from the active scheme and current session.
#[derive(Debug, Clone, Copy)]
pub struct AuthProvider {
    scheme: AuthScheme,
}

impl AuthProvider {
    /// Create a provider for the configured scheme.
    pub fn new(scheme: AuthScheme) -> Self {
        Self { scheme }
    }

    /// The active scheme.
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Derive headers for a request to `path`.
    ///
    /// Login and registration endpoints never carry authorization, under
    /// either scheme, regardless of what the session holds.
    pub fn headers_for(&self, path: &str, session: Option<&Session>) -> RequestHeaders {
        let authorization = if is_auth_endpoint(path) {
            None
        } else {
            match self.scheme {
                AuthScheme::Bearer => session
                    .and_then(|s| s.token.as_deref())
                    .map(|token| format!("Bearer {token}")),
                AuthScheme::Basic => session.and_then(basic_credentials),
            }
        };

        if authorization.is_none() && !is_auth_endpoint(path) {
            tracing::debug!(path, "no credentials available, sending unauthenticated");
        }

        RequestHeaders {
            content_type: "application/json",
            authorization,
        }
    }
}

/// Whether `path` is one of the endpoints that must never carry
/// authorization. Matched case-insensitively on the path segments.
fn is_auth_endpoint(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.contains("/auth/login") || lower.contains("/auth/register")
}

fn basic_credentials(session: &Session) -> Option<String> {
    let secret = session.credential_secret.as_deref()?;
    let encoded = STANDARD.encode(format!("{}:{}", session.username, secret));
    Some(format!("Basic {encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bearer_session() -> Session {
        Session::new(7, "ada").with_token("t0k3n")
    }

    #[test]
    fn bearer_header_attached_for_authenticated_path() {
        let provider = AuthProvider::new(AuthScheme::Bearer);
        let headers = provider.headers_for("/api/v1/users/7", Some(&bearer_session()));
        assert_eq!(headers.authorization.as_deref(), Some("Bearer t0k3n"));
        assert_eq!(headers.content_type, "application/json");
    }

    #[test]
    fn login_and_register_are_exempt_under_both_schemes() {
        let session = bearer_session().with_secret("pw");
        for scheme in [AuthScheme::Bearer, AuthScheme::Basic] {
            let provider = AuthProvider::new(scheme);
            for path in ["/api/v1/auth/login", "/api/V1/Auth/Register"] {
                let headers = provider.headers_for(path, Some(&session));
                assert_eq!(headers.authorization, None, "{scheme:?} {path}");
                assert_eq!(headers.content_type, "application/json");
            }
        }
    }

    #[test]
    fn basic_header_ignores_token_and_encodes_pair() {
        let session = Session::new(7, "ada").with_token("ignored").with_secret("pw");
        let provider = AuthProvider::new(AuthScheme::Basic);
        let headers = provider.headers_for("/api/bars", Some(&session));
        let expected = format!("Basic {}", STANDARD.encode("ada:pw"));
        assert_eq!(headers.authorization, Some(expected));
    }

    #[test]
    fn missing_material_still_yields_content_type() {
        let provider = AuthProvider::new(AuthScheme::Basic);
        let headers = provider.headers_for("/api/bars", Some(&Session::new(7, "ada")));
        assert_eq!(headers.authorization, None);
        assert_eq!(headers.content_type, "application/json");

        let provider = AuthProvider::new(AuthScheme::Bearer);
        let headers = provider.headers_for("/api/bars", None);
        assert_eq!(headers.authorization, None);
        assert_eq!(headers.content_type, "application/json");
    }
}
