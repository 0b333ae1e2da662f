//! Request-scoped values set by the auth pipeline and read by handlers and
//! the store.

use std::fmt;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The authenticated caller, as proven by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Principal(Uuid);

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self(user_id)
    }

    pub fn user_id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything a protected handler knows about the request it serves.
///
/// Inserted into request extensions by `require_auth`; a handler that takes
/// a `RequestScope` argument can only run behind that middleware.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub request_id: String,
    pub principal: Principal,
}

impl RequestScope {
    pub fn new(request_id: String, principal: Principal) -> Self {
        Self {
            request_id,
            principal,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.principal.user_id()
    }

    /// Whether the caller owns a row belonging to `owner`.
    pub fn owns(&self, owner: Uuid) -> bool {
        self.principal.user_id() == owner
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestScope>().cloned().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "request scope missing: handler is not mounted behind require_auth"
            ))
        })
    }
}

/// The request id assigned by the request-id layer, or empty if none.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_owns() {
        let me = Uuid::new_v4();
        let scope = RequestScope::new("req-1".into(), Principal::new(me));
        assert!(scope.owns(me));
        assert!(!scope.owns(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_missing_scope_fails_closed() {
        let (mut parts, _) = Request::new(()).into_parts();
        let err = RequestScope::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_scope_is_extracted() {
        let me = Uuid::new_v4();
        let (mut parts, _) = Request::new(()).into_parts();
        parts
            .extensions
            .insert(RequestScope::new("req-2".into(), Principal::new(me)));
        let scope = RequestScope::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(scope.user_id(), me);
        assert_eq!(scope.request_id, "req-2");
    }
}
