//! Authentication middleware and extractors for axum.
//!
//! - `TransportContext` - decided once per request: plain HTTP or WebSocket upgrade
//! - `auth_middleware` - reads the session token for that transport, validates
//!   it and injects `AuthenticatedUser` into extensions
//! - `RequireAuth` - extractor that requires an authenticated user
//!
//! ```text
//! Request → TransportContext::detect → session_token → SessionValidator
//!                                                   ↓
//!                         Handler ← RequireAuth reads AuthenticatedUser
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Auth middleware state - wraps the session validator.
pub type AuthState = Arc<dyn SessionValidator>;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Query parameter accepted on WebSocket upgrades.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// How the caller reached us. Each variant knows where its token lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportContext {
    /// `Authorization: Bearer`, then the session cookie.
    Http,
    /// Session cookie, then the `token` query parameter.
    WebSocket,
}

impl TransportContext {
    pub fn detect(headers: &HeaderMap) -> Self {
        let is_upgrade = headers
            .get(header::UPGRADE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
        if is_upgrade {
            TransportContext::WebSocket
        } else {
            TransportContext::Http
        }
    }

    pub fn session_token(&self, headers: &HeaderMap, uri: &Uri) -> Option<String> {
        match self {
            TransportContext::Http => bearer_token(headers).or_else(|| session_cookie(headers)),
            TransportContext::WebSocket => {
                session_cookie(headers).or_else(|| query_token(uri))
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|t| !t.is_empty())
}

fn query_token(uri: &Uri) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .get(TOKEN_QUERY_PARAM)
        .filter(|t| !t.is_empty())
        .cloned()
}

/// Authentication middleware.
///
/// Missing token: continues without a user, `RequireAuth` rejects later.
/// Invalid token: 401. Validator unavailable: 503.
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let transport = TransportContext::detect(request.headers());
    request.extensions_mut().insert(transport);

    let Some(token) = transport.session_token(request.headers(), request.uri()) else {
        return next.run(request).await;
    };

    match validator.validate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            let (status, message) = match &e {
                AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid session"),
                AuthError::UserNotFound => (StatusCode::UNAUTHORIZED, "Unknown user"),
                AuthError::ServiceUnavailable(msg) => {
                    tracing::error!("Auth service unavailable: {}", msg);
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Authentication service unavailable",
                    )
                }
            };

            (
                status,
                Json(serde_json::json!({
                    "error": message,
                    "code": "AUTH_ERROR"
                })),
            )
                .into_response()
        }
    }
}

/// Extractor that requires authentication.
///
/// ```ignore
/// async fn my_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .map(RequireAuth)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthRejection::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required")
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": "UNAUTHENTICATED"
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use axum::extract::FromRequestParts;
    use axum::http::{HeaderValue, Request};

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn test_user() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new(), "test@example.com")
    }

    // ════════════════════════════════════════════════════════════════════════════
    // TransportContext Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn upgrade_header_selects_websocket() {
        let ws = headers(&[(header::UPGRADE, "WebSocket")]);
        assert_eq!(TransportContext::detect(&ws), TransportContext::WebSocket);
        assert_eq!(TransportContext::detect(&HeaderMap::new()), TransportContext::Http);
    }

    #[test]
    fn http_prefers_bearer_over_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer a@example.com"),
            (header::COOKIE, "theme=dark; session=b@example.com"),
        ]);
        let uri: Uri = "/api/conversations".parse().unwrap();
        assert_eq!(
            TransportContext::Http.session_token(&h, &uri).as_deref(),
            Some("a@example.com")
        );
    }

    #[test]
    fn http_falls_back_to_cookie() {
        let h = headers(&[(header::COOKIE, "theme=dark; session=b@example.com")]);
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(
            TransportContext::Http.session_token(&h, &uri).as_deref(),
            Some("b@example.com")
        );
    }

    #[test]
    fn http_ignores_query_token() {
        let uri: Uri = "/api/live?token=c%40example.com".parse().unwrap();
        assert_eq!(TransportContext::Http.session_token(&HeaderMap::new(), &uri), None);
    }

    #[test]
    fn websocket_reads_cookie_then_query() {
        let uri: Uri = "/api/live?token=c%40example.com".parse().unwrap();
        assert_eq!(
            TransportContext::WebSocket
                .session_token(&HeaderMap::new(), &uri)
                .as_deref(),
            Some("c@example.com")
        );

        let h = headers(&[(header::COOKIE, "session=b@example.com")]);
        assert_eq!(
            TransportContext::WebSocket.session_token(&h, &uri).as_deref(),
            Some("b@example.com")
        );
    }

    #[test]
    fn websocket_ignores_bearer_header() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer a@example.com")]);
        let uri: Uri = "/api/live".parse().unwrap();
        assert_eq!(TransportContext::WebSocket.session_token(&h, &uri), None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // RequireAuth Extractor Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn require_auth_extracts_user_from_extensions() {
        let mut request: Request<()> = Request::builder().uri("/test").body(()).unwrap();
        request.extensions_mut().insert(test_user());
        let (mut parts, _body) = request.into_parts();

        let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn require_auth_fails_without_user() {
        let request: Request<()> = Request::builder().uri("/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthenticated)));
    }

    #[test]
    fn auth_rejection_returns_401() {
        let response = AuthRejection::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn auth_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthState>();
        assert_send_sync::<RequireAuth>();
    }
}
